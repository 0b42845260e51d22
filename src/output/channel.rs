// src/output/channel.rs

//! Per-task stdout/stderr capture through two temp files.

use std::collections::VecDeque;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{BatchError, Result};
use crate::output::reader::IncrementalReader;

/// Which captured stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// One tailed stream: backing file, reader, and lines waiting for delivery.
#[derive(Debug)]
struct StreamTail {
    path: PathBuf,
    reader: IncrementalReader,
    pending: VecDeque<String>,
}

impl StreamTail {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            reader: IncrementalReader::new(),
            pending: VecDeque::new(),
        }
    }

    fn pull(&mut self, take_all: bool, keep_ends: bool) -> Result<()> {
        if !self.path.is_file() {
            return Ok(());
        }
        self.reader.catch_up(&self.path)?;
        let lines = self.reader.produce_lines(take_all, keep_ends)?;
        self.pending.extend(lines);
        Ok(())
    }
}

/// Output capture for one task.
///
/// The task writes its stdout/stderr into two files created here; the
/// supervisor repeatedly calls [`pull_new_lines`](Self::pull_new_lines) and
/// drains the queued lines. After [`mark_closed`](Self::mark_closed), the
/// next pull also flushes an unterminated trailing fragment.
#[derive(Debug)]
pub struct TaskOutputChannel {
    out: StreamTail,
    err: StreamTail,
    keep_ends: bool,
    closed: bool,
    fault: Option<String>,
}

impl TaskOutputChannel {
    /// Create two empty, uniquely named files inside `dir`.
    pub fn new(dir: &Path, keep_ends: bool) -> Result<Self> {
        let out_path = create_empty_file(dir, "out-")?;
        let err_path = create_empty_file(dir, "err-")?;

        debug!(
            stdout = %out_path.display(),
            stderr = %err_path.display(),
            "allocated task output files"
        );

        Ok(Self {
            out: StreamTail::new(out_path),
            err: StreamTail::new(err_path),
            keep_ends,
            closed: false,
            fault: None,
        })
    }

    pub fn stdout_path(&self) -> &Path {
        &self.out.path
    }

    pub fn stderr_path(&self) -> &Path {
        &self.err.path
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// First reader fault seen on either stream, if any.
    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    /// The writer has exited; the next pull takes everything that is left.
    pub fn mark_closed(&mut self) {
        self.closed = true;
    }

    /// Read whatever both files gained since the last pull and queue the
    /// resulting lines.
    ///
    /// Both streams are always attempted. If either fails, the first error is
    /// returned and remembered in [`fault`](Self::fault).
    pub fn pull_new_lines(&mut self) -> Result<()> {
        let take_all = self.closed;
        let out_res = self.out.pull(take_all, self.keep_ends);
        let err_res = self.err.pull(take_all, self.keep_ends);

        let res = out_res.and(err_res);
        if let Err(ref e) = res {
            if self.fault.is_none() {
                self.fault = Some(e.to_string());
            }
        }
        res
    }

    pub fn drain_stdout(&mut self) -> Vec<String> {
        self.out.pending.drain(..).collect()
    }

    pub fn drain_stderr(&mut self) -> Vec<String> {
        self.err.pending.drain(..).collect()
    }

    pub fn drain(&mut self, stream: Stream) -> Vec<String> {
        match stream {
            Stream::Stdout => self.drain_stdout(),
            Stream::Stderr => self.drain_stderr(),
        }
    }

    /// Delete both backing files. Safe to call more than once.
    pub fn release(&self) -> Result<()> {
        remove_if_present(&self.out.path)?;
        remove_if_present(&self.err.path)?;
        Ok(())
    }
}

fn create_empty_file(dir: &Path, prefix: &str) -> Result<PathBuf> {
    let path = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".log")
        .tempfile_in(dir)?
        .into_temp_path()
        .keep()
        .map_err(|e| BatchError::IoError(e.error))?;
    Ok(path)
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
