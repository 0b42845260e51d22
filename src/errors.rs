// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("command argument vector must not be empty")]
    EmptyCommand,

    #[error("output paths already assigned")]
    OutputPathsAlreadyAssigned,

    #[error("output paths not assigned")]
    OutputPathsNotAssigned,

    #[error("file {path:?} was truncated from {expected} to {actual} bytes")]
    Truncated {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("incremental reader is faulted")]
    ReaderFaulted,

    #[error("supervisor has already been started")]
    AlreadyStarted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a worker pool could not hand back a job's result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("job has not finished yet")]
    NotReady,

    #[error("job result was already taken")]
    AlreadyTaken,

    #[error("job panicked or was dropped before producing a result")]
    Panicked,
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BatchError>;
