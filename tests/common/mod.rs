#![allow(dead_code)]

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub use batchrun_test_utils::{init_tracing, sh, with_timeout, CollectingSink};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Append raw bytes to `path`, creating it if needed.
pub fn append(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    f.write_all(bytes)?;
    f.flush()
}

/// Shrink (or grow) `path` to exactly `len` bytes.
pub fn truncate_to(path: &Path, len: u64) -> std::io::Result<()> {
    OpenOptions::new().write(true).open(path)?.set_len(len)
}

/// All entries directly under `dir`.
pub fn entries(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(rd) => rd.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => Vec::new(),
    }
}

/// Total number of files one level below `root` (i.e. inside each scratch
/// directory the supervisor created there).
pub fn files_in_scratch_dirs(root: &Path) -> usize {
    entries(root).iter().map(|d| entries(d).len()).sum()
}
