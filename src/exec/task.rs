// src/exec/task.rs

//! A single external command invocation.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context;
use tracing::{error, info};

use crate::errors::{BatchError, Result};

/// What became of a task's process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskOutcome {
    /// Not executed yet (or still executing).
    #[default]
    Pending,
    /// The process ran to completion with this exit code.
    ///
    /// A process terminated by a signal reports `-1`.
    Exited(i32),
    /// The process could not be opened, spawned, or waited on.
    Faulted(String),
}

impl TaskOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskOutcome::Pending)
    }

    /// Exited with code 0.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Exited(0))
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Pending => write!(f, "pending"),
            TaskOutcome::Exited(code) => write!(f, "exited with code {code}"),
            TaskOutcome::Faulted(msg) => write!(f, "faulted: {msg}"),
        }
    }
}

#[derive(Debug, Clone)]
struct OutputPaths {
    stdout: PathBuf,
    stderr: PathBuf,
}

/// One command in the batch.
///
/// The argument vector is fixed at construction. Output paths are assigned
/// exactly once, right before the task is dispatched.
#[derive(Debug, Clone)]
pub struct ExternalTask {
    argv: Vec<String>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    paths: Option<OutputPaths>,
    outcome: TaskOutcome,
}

impl ExternalTask {
    /// Build a task from a program followed by its arguments.
    ///
    /// Arguments are passed through as-is, never re-split or shell-quoted.
    pub fn new<I, S>(argv: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        if argv.is_empty() {
            return Err(BatchError::EmptyCommand);
        }
        Ok(Self {
            argv,
            cwd: None,
            env: BTreeMap::new(),
            paths: None,
            outcome: TaskOutcome::Pending,
        })
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn current_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn stdout_path(&self) -> Option<&Path> {
        self.paths.as_ref().map(|p| p.stdout.as_path())
    }

    pub fn stderr_path(&self) -> Option<&Path> {
        self.paths.as_ref().map(|p| p.stderr.as_path())
    }

    pub fn outcome(&self) -> &TaskOutcome {
        &self.outcome
    }

    pub fn has_exited(&self) -> bool {
        !self.outcome.is_pending()
    }

    /// Set where stdout and stderr will be written. Write-once.
    pub fn assign_output_paths(
        &mut self,
        stdout: impl Into<PathBuf>,
        stderr: impl Into<PathBuf>,
    ) -> Result<()> {
        if self.paths.is_some() {
            return Err(BatchError::OutputPathsAlreadyAssigned);
        }
        self.paths = Some(OutputPaths {
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
        Ok(())
    }

    /// Snapshot everything needed to run this task on another thread.
    pub fn prepare(&self) -> Result<Invocation> {
        let paths = self
            .paths
            .clone()
            .ok_or(BatchError::OutputPathsNotAssigned)?;
        Ok(Invocation {
            task: None,
            argv: self.argv.clone(),
            cwd: self.cwd.clone(),
            env: self.env.clone(),
            stdout: paths.stdout,
            stderr: paths.stderr,
        })
    }

    pub fn record_outcome(&mut self, outcome: TaskOutcome) {
        self.outcome = outcome;
    }

    /// Run the command on the current thread and record its outcome.
    ///
    /// Only a missing output-path assignment is an error; anything that goes
    /// wrong with the process itself ends up as [`TaskOutcome::Faulted`].
    pub fn execute(&mut self) -> Result<&TaskOutcome> {
        let invocation = self.prepare()?;
        self.outcome = invocation.run();
        Ok(&self.outcome)
    }
}

/// Owned, `Send` description of a ready-to-run command.
#[derive(Debug, Clone)]
pub struct Invocation {
    task: Option<usize>,
    argv: Vec<String>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    stdout: PathBuf,
    stderr: PathBuf,
}

impl Invocation {
    /// Tag log records with the task's position in its batch.
    pub fn for_task(mut self, task: usize) -> Self {
        self.task = Some(task);
        self
    }

    pub fn task(&self) -> Option<usize> {
        self.task
    }

    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }

    /// Spawn the process with its output redirected to the assigned files
    /// and block until it exits.
    pub fn run(self) -> TaskOutcome {
        let cmd_line = self.command_line();
        match self.run_inner() {
            Ok(code) => {
                info!(task = self.task, cmd = %cmd_line, exit_code = code, "task process exited");
                TaskOutcome::Exited(code)
            }
            Err(err) => {
                error!(
                    task = self.task,
                    cmd = %cmd_line,
                    error = %format!("{err:#}"),
                    "task execution error"
                );
                TaskOutcome::Faulted(format!("{err:#}"))
            }
        }
    }

    fn run_inner(&self) -> anyhow::Result<i32> {
        let out = File::create(&self.stdout)
            .with_context(|| format!("opening stdout file {:?}", self.stdout))?;
        let err = File::create(&self.stderr)
            .with_context(|| format!("opening stderr file {:?}", self.stderr))?;

        let (program, args) = self
            .argv
            .split_first()
            .context("empty argument vector")?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::from(err));
        if let Some(ref dir) = self.cwd {
            cmd.current_dir(dir);
        }

        info!(task = self.task, cmd = %self.command_line(), "starting task process");

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process '{program}'"))?;
        let status = child
            .wait()
            .with_context(|| format!("waiting for process '{program}'"))?;

        Ok(status.code().unwrap_or(-1))
    }
}
