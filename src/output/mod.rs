// src/output/mod.rs

//! Incremental output capture.
//!
//! - [`reader`] tails one growing file and cuts it into lines.
//! - [`channel`] pairs two readers (stdout/stderr) with their temp files for
//!   a single task and owns their cleanup.

pub mod channel;
pub mod reader;

pub use channel::{Stream, TaskOutputChannel};
pub use reader::IncrementalReader;
