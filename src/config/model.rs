// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::{default_max_in_flight, SupervisorOptions};
use crate::errors::Result;
use crate::exec::ExternalTask;

/// Top-level batch file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// max_in_flight = 4
/// poll_interval_ms = 100
///
/// [[task]]
/// args = ["pip", "install", "--dry-run", "requests"]
///
/// [[task]]
/// args = ["pip", "install", "--dry-run", "numpy"]
/// env = { PIP_NO_INPUT = "1" }
/// ```
///
/// All sections are optional at this level; [`BatchFile`] is the validated
/// form.
#[derive(Debug, Clone, Deserialize)]
pub struct RawBatchFile {
    /// Global behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Commands from `[[task]]`, in batch order.
    #[serde(default)]
    pub task: Vec<TaskSpec>,
}

/// Validated batch file.
///
/// Only obtainable through `TryFrom<RawBatchFile>` (see `validate.rs`) or
/// the loader.
#[derive(Debug, Clone)]
pub struct BatchFile {
    pub config: ConfigSection,
    pub task: Vec<TaskSpec>,
}

impl BatchFile {
    pub(crate) fn new_unchecked(config: ConfigSection, task: Vec<TaskSpec>) -> Self {
        Self { config, task }
    }

    /// Supervisor options described by `[config]`.
    pub fn supervisor_options(&self) -> SupervisorOptions {
        SupervisorOptions {
            max_in_flight: self.config.max_in_flight,
            poll_interval: Duration::from_millis(self.config.poll_interval_ms),
            keep_line_ends: self.config.keep_line_ends,
            temp_root: self.config.temp_root.clone(),
        }
    }

    /// Build one [`ExternalTask`] per `[[task]]` entry, in order.
    pub fn tasks(&self) -> Result<Vec<ExternalTask>> {
        self.task.iter().map(TaskSpec::to_task).collect()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// How many commands may run at the same time.
    ///
    /// Defaults to the number of available CPUs.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Delay between two supervisor poll cycles, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Deliver lines with their terminators attached.
    #[serde(default)]
    pub keep_line_ends: bool,

    /// Where to create the scratch directory for captured output.
    #[serde(default)]
    pub temp_root: Option<PathBuf>,
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
            poll_interval_ms: default_poll_interval_ms(),
            keep_line_ends: false,
            temp_root: None,
        }
    }
}

/// `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    /// Program followed by its arguments. Never run through a shell.
    pub args: Vec<String>,

    /// Working directory for the process.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Extra environment variables for the process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl TaskSpec {
    pub fn to_task(&self) -> Result<ExternalTask> {
        let mut task = ExternalTask::new(self.args.iter().cloned())?;
        if let Some(ref dir) = self.cwd {
            task = task.with_current_dir(dir);
        }
        for (k, v) in &self.env {
            task = task.with_env(k, v);
        }
        Ok(task)
    }
}
