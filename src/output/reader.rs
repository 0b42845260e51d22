// src/output/reader.rs

//! Incremental tail reader for a file that another process is appending to.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{trace, warn};

use crate::errors::{BatchError, Result};

/// Tails a single growing file.
///
/// `catch_up` copies bytes appended since the previous call into an internal
/// buffer; `produce_lines` turns whatever is line-complete into text. Bytes
/// that have not yet been resolved into a line stay buffered across calls, so
/// a line whose terminator arrives in a later write is never split.
///
/// If the file ever shrinks below the consumed position the reader faults
/// permanently.
#[derive(Debug, Default)]
pub struct IncrementalReader {
    data: Vec<u8>,
    pos: u64,
    faulted: bool,
}

impl IncrementalReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes of the source file consumed so far.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Number of bytes buffered but not yet produced as lines.
    pub fn buffered_len(&self) -> usize {
        self.data.len()
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Copy newly appended content of `path` into the buffer.
    ///
    /// A missing file is not an error here; there is simply nothing new.
    pub fn catch_up(&mut self, path: &Path) -> Result<()> {
        if self.faulted {
            return Err(BatchError::ReaderFaulted);
        }

        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let size = file.metadata()?.len();
        if size < self.pos {
            self.faulted = true;
            warn!(
                path = %path.display(),
                expected = self.pos,
                actual = size,
                "tailed file shrank; reader is now faulted"
            );
            return Err(BatchError::Truncated {
                path: path.to_path_buf(),
                expected: self.pos,
                actual: size,
            });
        }
        if size == self.pos {
            return Ok(());
        }

        file.seek(SeekFrom::Start(self.pos))?;
        let n = file
            .take(size - self.pos)
            .read_to_end(&mut self.data)?;
        self.pos += n as u64;

        trace!(path = %path.display(), read = n, pos = self.pos, "caught up");
        Ok(())
    }

    /// Take as many terminated lines from the buffer as possible.
    ///
    /// With `take_all`, everything buffered is taken, including a trailing
    /// fragment with no terminator. With `keep_ends`, each line keeps its
    /// `\n`, `\r` or `\r\n`.
    pub fn produce_lines(&mut self, take_all: bool, keep_ends: bool) -> Result<Vec<String>> {
        if self.faulted {
            return Err(BatchError::ReaderFaulted);
        }

        let cut = if take_all {
            self.data.len()
        } else {
            self.data
                .iter()
                .rposition(|&b| b == b'\n' || b == b'\r')
                .map_or(0, |i| i + 1)
        };
        if cut == 0 {
            return Ok(Vec::new());
        }

        let rest = self.data.split_off(cut);
        let taken = std::mem::replace(&mut self.data, rest);

        Ok(split_lines(&taken, keep_ends)
            .into_iter()
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
            .collect())
    }
}

/// Split on `\n`, `\r` and `\r\n`, like universal-newline line splitting.
///
/// A trailing terminator does not produce an extra empty line.
fn split_lines(bytes: &[u8], keep_ends: bool) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let end_len = match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => 2,
            b'\r' | b'\n' => 1,
            _ => {
                i += 1;
                continue;
            }
        };
        let stop = if keep_ends { i + end_len } else { i };
        lines.push(&bytes[start..stop]);
        i += end_len;
        start = i;
    }

    if start < bytes.len() {
        lines.push(&bytes[start..]);
    }
    lines
}
