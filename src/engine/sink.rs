// src/engine/sink.rs

//! Where the supervisor's text events go.

use std::fmt;

use crate::output::Stream;

/// One reportable event from the supervisor's poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// A complete line of captured output.
    Output {
        task: usize,
        stream: Stream,
        line: String,
    },
    /// The task reached a terminal state.
    Finished { task: usize, success: bool },
}

impl fmt::Display for SupervisorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupervisorEvent::Output {
                task,
                stream: Stream::Stdout,
                line,
            } => write!(f, "[{task}] OUT {line}"),
            SupervisorEvent::Output {
                task,
                stream: Stream::Stderr,
                line,
            } => write!(f, "[{task}] ERR {line}"),
            SupervisorEvent::Finished {
                task,
                success: true,
            } => write!(f, "[{task}] SUCCESS"),
            SupervisorEvent::Finished {
                task,
                success: false,
            } => write!(f, "[{task}] FAILURE"),
        }
    }
}

/// Receives one formatted string per supervisor event, synchronously from
/// the poll loop.
pub trait TextSink {
    fn emit(&mut self, text: String);
}

impl<F> TextSink for F
where
    F: FnMut(String),
{
    fn emit(&mut self, text: String) {
        self(text)
    }
}

/// Default sink: print every event on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl TextSink for StdoutSink {
    fn emit(&mut self, text: String) {
        println!("{text}");
    }
}
