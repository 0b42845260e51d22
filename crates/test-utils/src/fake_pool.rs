use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use batchrun::errors::JobError;
use batchrun::exec::{Job, JobHandle, TaskOutcome, WorkerPool};

/// Counters shared between a `FakePool` and all of its handles.
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Jobs submitted so far.
    pub submitted: usize,
    /// Handles whose result has not been taken yet.
    pub outstanding: usize,
    /// Highest value `outstanding` ever reached.
    pub peak_outstanding: usize,
}

/// A worker pool double that runs jobs on the calling thread.
///
/// - `delay_polls == 0`: the job runs inside `submit`, so the handle is ready
///   immediately and jobs run in exactly the order they were submitted.
/// - `delay_polls == n`: the job runs on the `n`-th `is_ready` call.
///
/// Submissions listed in `lost` (by submission number) never run and report
/// `JobError::Panicked`, as if the worker had died.
#[derive(Debug, Clone, Default)]
pub struct FakePool {
    delay_polls: usize,
    lost: BTreeSet<usize>,
    stats: Arc<Mutex<PoolStats>>,
}

impl FakePool {
    pub fn inline() -> Self {
        Self::default()
    }

    pub fn deferred(delay_polls: usize) -> Self {
        Self {
            delay_polls,
            ..Self::default()
        }
    }

    pub fn with_lost_job(mut self, submission: usize) -> Self {
        self.lost.insert(submission);
        self
    }

    pub fn stats(&self) -> Arc<Mutex<PoolStats>> {
        Arc::clone(&self.stats)
    }
}

impl WorkerPool for FakePool {
    type Handle = FakeHandle;

    fn submit(&self, job: Job) -> Self::Handle {
        let submission = {
            let mut stats = self.stats.lock().unwrap();
            let n = stats.submitted;
            stats.submitted += 1;
            stats.outstanding += 1;
            stats.peak_outstanding = stats.peak_outstanding.max(stats.outstanding);
            n
        };

        let mut handle = FakeHandle {
            job: None,
            result: None,
            polls_left: self.delay_polls,
            taken: false,
            stats: Arc::clone(&self.stats),
        };

        if self.lost.contains(&submission) {
            handle.result = Some(Err(JobError::Panicked));
        } else if self.delay_polls == 0 {
            handle.result = Some(Ok(job()));
        } else {
            handle.job = Some(job);
        }
        handle
    }
}

pub struct FakeHandle {
    job: Option<Job>,
    result: Option<Result<TaskOutcome, JobError>>,
    polls_left: usize,
    taken: bool,
    stats: Arc<Mutex<PoolStats>>,
}

impl JobHandle for FakeHandle {
    fn is_ready(&mut self) -> bool {
        if self.result.is_some() || self.taken {
            return true;
        }
        self.polls_left = self.polls_left.saturating_sub(1);
        if self.polls_left == 0 {
            if let Some(job) = self.job.take() {
                self.result = Some(Ok(job()));
            }
        }
        self.result.is_some()
    }

    fn succeeded(&self) -> bool {
        matches!(self.result, Some(Ok(_)))
    }

    fn take_result(&mut self) -> Result<TaskOutcome, JobError> {
        if self.taken {
            return Err(JobError::AlreadyTaken);
        }
        match self.result.take() {
            Some(res) => {
                self.taken = true;
                self.stats.lock().unwrap().outstanding -= 1;
                res
            }
            None => Err(JobError::NotReady),
        }
    }
}
