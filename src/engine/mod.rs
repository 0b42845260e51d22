// src/engine/mod.rs

//! Orchestration engine for batchrun.
//!
//! This module ties together:
//! - the task list and its FIFO admission queue
//! - the worker pool the tasks are dispatched to
//! - per-task output channels and the text sink their lines are sent to
//!
//! The poll loop itself lives in [`supervisor`]; the event formatting and
//! sink trait live in [`sink`].

pub mod sink;
pub mod supervisor;

pub use sink::{StdoutSink, SupervisorEvent, TextSink};
pub use supervisor::{
    default_max_in_flight, BatchReport, Supervisor, SupervisorOptions, DEFAULT_POLL_INTERVAL,
};
