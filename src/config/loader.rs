// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{BatchFile, RawBatchFile};
use crate::errors::Result;

/// Load a batch file from a given path and return the raw `RawBatchFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawBatchFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let raw: RawBatchFile = toml::from_str(&contents)?;
    debug!(path = %path.display(), tasks = raw.task.len(), "loaded batch file");

    Ok(raw)
}

/// Load a batch file from path and run basic validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - at least one task,
///   - empty argument vectors,
///   - sane `[config]` values.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<BatchFile> {
    let raw = load_from_path(&path)?;
    let batch = BatchFile::try_from(raw)?;
    Ok(batch)
}

/// `Batchrun.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Batchrun.toml")
}
