// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`task`] holds [`ExternalTask`], one command with its argument vector,
//!   output-file assignment and recorded [`TaskOutcome`].
//! - [`pool`] provides the `WorkerPool` / `JobHandle` traits the supervisor
//!   dispatches through, and `BlockingPool`, the production implementation
//!   backed by Tokio's blocking thread pool.

pub mod pool;
pub mod task;

pub use pool::{BlockingJobHandle, BlockingPool, Job, JobHandle, WorkerPool};
pub use task::{ExternalTask, Invocation, TaskOutcome};
