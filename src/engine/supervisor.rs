// src/engine/supervisor.rs

//! Task-list executor.
//!
//! The supervisor owns a fixed batch of [`ExternalTask`]s and drives them
//! through `NotStarted -> InFlight -> {Succeeded | Failed}` with a polling
//! loop:
//!
//! 1. admit queued tasks while fewer than `max_in_flight` are running,
//! 2. classify every in-flight job handle as running / succeeded / failed,
//! 3. pull captured output for every in-flight task and forward it to the
//!    sink, flushing and releasing the files of tasks that just finished,
//! 4. sleep for `poll_interval`.
//!
//! All state here is touched only from that loop. The worker pool is the
//! only concurrent component.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::engine::sink::{SupervisorEvent, TextSink};
use crate::errors::{BatchError, Result};
use crate::exec::{ExternalTask, JobHandle, TaskOutcome, WorkerPool};
use crate::output::{Stream, TaskOutputChannel};

/// Default delay between two poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Knobs for a single supervisor run.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Upper bound on simultaneously in-flight tasks. Must be at least 1.
    pub max_in_flight: usize,
    /// Sleep between poll cycles. Must be non-zero.
    pub poll_interval: Duration,
    /// Keep `\n` / `\r\n` on delivered lines.
    pub keep_line_ends: bool,
    /// Parent directory for the run's scratch directory. `None` uses the
    /// system temp dir.
    pub temp_root: Option<PathBuf>,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            keep_line_ends: false,
            temp_root: None,
        }
    }
}

/// Number of CPUs, or 1 if that cannot be determined.
pub fn default_max_in_flight() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}

/// Final partition of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: BTreeSet<usize>,
    pub failed: BTreeSet<usize>,
    /// Recorded outcome of every task, by index.
    pub outcomes: Vec<TaskOutcome>,
    /// Tasks whose output could not be read to the end, with the reason.
    pub output_faults: BTreeMap<usize, String>,
}

impl BatchReport {
    pub fn task_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Running,
    Succeeded,
    Failed,
}

struct InFlight<H> {
    channel: TaskOutputChannel,
    handle: H,
}

/// Runs a batch of tasks with bounded concurrency and incremental output.
pub struct Supervisor<P: WorkerPool> {
    pool: P,
    tasks: Vec<ExternalTask>,
    options: SupervisorOptions,
    not_started: VecDeque<usize>,
    in_flight: BTreeMap<usize, InFlight<P::Handle>>,
    succeeded: BTreeSet<usize>,
    failed: BTreeSet<usize>,
    output_faults: BTreeMap<usize, String>,
    started: bool,
}

impl<P: WorkerPool> std::fmt::Debug for Supervisor<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("tasks", &self.tasks.len())
            .field("options", &self.options)
            .field("not_started", &self.not_started)
            .field("in_flight", &self.in_flight.keys().collect::<Vec<_>>())
            .field("succeeded", &self.succeeded)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl<P: WorkerPool> Supervisor<P> {
    pub fn new(pool: P, tasks: Vec<ExternalTask>, options: SupervisorOptions) -> Result<Self> {
        if options.max_in_flight == 0 {
            return Err(BatchError::ConfigError(
                "max_in_flight must be >= 1 (got 0)".to_string(),
            ));
        }
        if options.poll_interval.is_zero() {
            return Err(BatchError::ConfigError(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        let not_started = (0..tasks.len()).collect();
        Ok(Self {
            pool,
            tasks,
            options,
            not_started,
            in_flight: BTreeMap::new(),
            succeeded: BTreeSet::new(),
            failed: BTreeSet::new(),
            output_faults: BTreeMap::new(),
            started: false,
        })
    }

    pub fn tasks(&self) -> &[ExternalTask] {
        &self.tasks
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Every task has reached a terminal state.
    pub fn is_complete(&self) -> bool {
        self.succeeded.len() + self.failed.len() == self.tasks.len()
    }

    /// Run the whole batch to completion, forwarding output to `sink`.
    ///
    /// A supervisor can only be run once. Individual task failures never make
    /// this return an error; they show up in the returned [`BatchReport`].
    pub async fn run<S>(&mut self, sink: &mut S) -> Result<BatchReport>
    where
        S: TextSink + ?Sized,
    {
        if self.started {
            return Err(BatchError::AlreadyStarted);
        }
        self.started = true;

        let scratch = self.create_scratch_dir()?;
        info!(
            tasks = self.tasks.len(),
            max_in_flight = self.options.max_in_flight,
            scratch = %scratch.path().display(),
            "batch started"
        );

        let res = self.drive(scratch.path(), sink).await;
        if res.is_err() {
            self.abandon(sink);
        }

        if let Err(e) = scratch.close() {
            warn!(error = %e, "failed to remove scratch directory");
        }
        res?;

        info!(
            succeeded = self.succeeded.len(),
            failed = self.failed.len(),
            "batch finished"
        );
        Ok(self.report())
    }

    fn create_scratch_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("batchrun-");
        let dir = match self.options.temp_root {
            Some(ref root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    async fn drive<S>(&mut self, dir: &Path, sink: &mut S) -> Result<()>
    where
        S: TextSink + ?Sized,
    {
        while !self.is_complete() {
            self.admit(dir)?;
            self.process_output(sink);
            if self.is_complete() {
                break;
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
        Ok(())
    }

    /// Start queued tasks, in order, until the concurrency cap is reached.
    fn admit(&mut self, dir: &Path) -> Result<()> {
        while self.in_flight.len() < self.options.max_in_flight {
            let Some(idx) = self.not_started.pop_front() else {
                break;
            };

            let channel = match TaskOutputChannel::new(dir, self.options.keep_line_ends) {
                Ok(c) => c,
                Err(e) => {
                    self.not_started.push_front(idx);
                    return Err(e);
                }
            };

            let prepared = {
                let task = &mut self.tasks[idx];
                task.assign_output_paths(channel.stdout_path(), channel.stderr_path())
                    .and_then(|()| task.prepare())
                    .map(|inv| inv.for_task(idx))
            };
            let invocation = match prepared {
                Ok(inv) => inv,
                Err(e) => {
                    if let Err(release_err) = channel.release() {
                        warn!(task = idx, error = %release_err, "failed to remove task output files");
                    }
                    self.not_started.push_front(idx);
                    return Err(e);
                }
            };
            let handle = self.pool.submit(Box::new(move || invocation.run()));

            self.in_flight.insert(idx, InFlight { channel, handle });
            debug!(
                task = idx,
                in_flight = self.in_flight.len(),
                "admitted task"
            );
        }
        Ok(())
    }

    /// Look at every in-flight handle once, without waiting.
    ///
    /// A finished job only counts as a success if the pool delivered its
    /// result and the process exited with code 0; anything else is a failure.
    fn classify(&mut self) -> BTreeMap<usize, Status> {
        let mut statuses = BTreeMap::new();

        for (&idx, slot) in self.in_flight.iter_mut() {
            if !slot.handle.is_ready() {
                statuses.insert(idx, Status::Running);
                continue;
            }

            let delivered = slot.handle.succeeded();
            let outcome = match slot.handle.take_result() {
                Ok(outcome) => outcome,
                Err(e) => TaskOutcome::Faulted(format!("worker pool: {e}")),
            };

            let status = if delivered && outcome.is_success() {
                Status::Succeeded
            } else {
                Status::Failed
            };
            self.tasks[idx].record_outcome(outcome);
            statuses.insert(idx, status);
        }

        statuses
    }

    fn process_output<S>(&mut self, sink: &mut S)
    where
        S: TextSink + ?Sized,
    {
        if self.in_flight.is_empty() {
            return;
        }

        let statuses = self.classify();
        let mut finished = Vec::new();

        for (&idx, slot) in self.in_flight.iter_mut() {
            let status = statuses.get(&idx).copied().unwrap_or(Status::Failed);
            let stopped = status != Status::Running;
            if stopped {
                slot.channel.mark_closed();
            }

            let already_faulted = slot.channel.fault().is_some();
            if let Err(e) = slot.channel.pull_new_lines() {
                if !already_faulted {
                    warn!(task = idx, error = %e, "failed to read task output");
                }
            }

            forward_lines(idx, &mut slot.channel, sink);

            if !stopped {
                continue;
            }

            let status = if slot.channel.fault().is_some() {
                Status::Failed
            } else {
                status
            };
            sink.emit(
                SupervisorEvent::Finished {
                    task: idx,
                    success: status == Status::Succeeded,
                }
                .to_string(),
            );
            if let Err(e) = slot.channel.release() {
                warn!(task = idx, error = %e, "failed to remove task output files");
            }
            finished.push((idx, status));
        }

        for (idx, status) in finished {
            if let Some(slot) = self.in_flight.remove(&idx) {
                if let Some(fault) = slot.channel.fault() {
                    self.output_faults.insert(idx, fault.to_string());
                }
            }

            let outcome = self.tasks[idx].outcome();
            if status == Status::Succeeded {
                info!(task = idx, %outcome, "task succeeded");
                self.succeeded.insert(idx);
            } else {
                warn!(task = idx, %outcome, "task failed");
                self.failed.insert(idx);
            }
        }
    }

    /// Flush what is left after the loop stopped on an error.
    ///
    /// Tasks that have already finished are reported as usual. Tasks still
    /// running get their captured output forwarded and their files released,
    /// but no status line: they stay unclassified.
    fn abandon<S>(&mut self, sink: &mut S)
    where
        S: TextSink + ?Sized,
    {
        self.process_output(sink);

        for (idx, mut slot) in std::mem::take(&mut self.in_flight) {
            slot.channel.mark_closed();
            if let Err(e) = slot.channel.pull_new_lines() {
                warn!(task = idx, error = %e, "failed to read task output");
            }
            forward_lines(idx, &mut slot.channel, sink);
            if let Err(e) = slot.channel.release() {
                warn!(task = idx, error = %e, "failed to remove task output files");
            }
            warn!(task = idx, "abandoned unfinished task");
        }
    }

    fn report(&self) -> BatchReport {
        BatchReport {
            succeeded: self.succeeded.clone(),
            failed: self.failed.clone(),
            outcomes: self.tasks.iter().map(|t| t.outcome().clone()).collect(),
            output_faults: self.output_faults.clone(),
        }
    }
}

/// Send every queued line of `channel` to `sink`, stdout before stderr.
fn forward_lines<S>(task: usize, channel: &mut TaskOutputChannel, sink: &mut S)
where
    S: TextSink + ?Sized,
{
    for stream in [Stream::Stdout, Stream::Stderr] {
        for line in channel.drain(stream) {
            sink.emit(SupervisorEvent::Output { task, stream, line }.to_string());
        }
    }
}
