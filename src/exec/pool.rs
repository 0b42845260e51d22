// src/exec/pool.rs

//! Pluggable worker pool abstraction.
//!
//! The supervisor talks to a `WorkerPool` instead of spawning processes
//! itself. It submits a zero-argument job, gets a handle back, and polls that
//! handle without ever blocking on it.
//!
//! - `BlockingPool` is the production implementation. It runs each job on
//!   Tokio's blocking thread pool and hands the result back through a
//!   oneshot channel.
//! - Tests can provide their own `WorkerPool` that, for example, runs jobs
//!   inline or only reports readiness after a number of polls.

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::debug;

use crate::errors::JobError;
use crate::exec::task::TaskOutcome;

/// A unit of work handed to a pool.
pub type Job = Box<dyn FnOnce() -> TaskOutcome + Send + 'static>;

/// Something that can run jobs concurrently.
pub trait WorkerPool {
    type Handle: JobHandle;

    /// Start `job` and return a handle for observing it.
    fn submit(&self, job: Job) -> Self::Handle;
}

/// Non-blocking view of one submitted job.
pub trait JobHandle {
    /// Whether the job has finished, successfully or not. Never blocks.
    fn is_ready(&mut self) -> bool;

    /// Whether the job produced a result. Only meaningful once ready.
    fn succeeded(&self) -> bool;

    /// Take the job's result (or the reason there is none).
    ///
    /// Returns [`JobError::NotReady`] before the job has finished and
    /// [`JobError::AlreadyTaken`] on a second call.
    fn take_result(&mut self) -> Result<TaskOutcome, JobError>;
}

/// Runs jobs on Tokio's blocking thread pool.
#[derive(Debug, Clone)]
pub struct BlockingPool {
    runtime: Handle,
}

impl BlockingPool {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Use the runtime of the calling context.
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl WorkerPool for BlockingPool {
    type Handle = BlockingJobHandle;

    fn submit(&self, job: Job) -> Self::Handle {
        let (tx, rx) = oneshot::channel();

        self.runtime.spawn_blocking(move || {
            let outcome = job();
            if tx.send(outcome).is_err() {
                debug!("job handle dropped before the result was delivered");
            }
        });

        BlockingJobHandle {
            rx: Some(rx),
            state: SlotState::Waiting,
        }
    }
}

#[derive(Debug)]
enum SlotState {
    Waiting,
    Done(TaskOutcome),
    Lost,
    Taken,
}

/// Handle returned by [`BlockingPool::submit`].
#[derive(Debug)]
pub struct BlockingJobHandle {
    rx: Option<oneshot::Receiver<TaskOutcome>>,
    state: SlotState,
}

impl JobHandle for BlockingJobHandle {
    fn is_ready(&mut self) -> bool {
        if let SlotState::Waiting = self.state {
            let polled = match self.rx.as_mut() {
                Some(rx) => rx.try_recv(),
                None => Err(TryRecvError::Closed),
            };
            match polled {
                Ok(outcome) => {
                    self.state = SlotState::Done(outcome);
                    self.rx = None;
                }
                Err(TryRecvError::Closed) => {
                    // Sender dropped without sending: the job panicked.
                    self.state = SlotState::Lost;
                    self.rx = None;
                }
                Err(TryRecvError::Empty) => return false,
            }
        }
        true
    }

    fn succeeded(&self) -> bool {
        matches!(self.state, SlotState::Done(_))
    }

    fn take_result(&mut self) -> Result<TaskOutcome, JobError> {
        if !self.is_ready() {
            return Err(JobError::NotReady);
        }
        match std::mem::replace(&mut self.state, SlotState::Taken) {
            SlotState::Done(outcome) => Ok(outcome),
            SlotState::Lost => {
                self.state = SlotState::Lost;
                Err(JobError::Panicked)
            }
            SlotState::Taken => Err(JobError::AlreadyTaken),
            SlotState::Waiting => {
                self.state = SlotState::Waiting;
                Err(JobError::NotReady)
            }
        }
    }
}
