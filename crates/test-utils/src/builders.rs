#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use batchrun::config::{BatchFile, ConfigSection, RawBatchFile, TaskSpec};

/// Builder for `BatchFile` to simplify test setup.
pub struct BatchFileBuilder {
    batch: RawBatchFile,
}

impl BatchFileBuilder {
    pub fn new() -> Self {
        Self {
            batch: RawBatchFile {
                config: ConfigSection::default(),
                task: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: TaskSpec) -> Self {
        self.batch.task.push(task);
        self
    }

    pub fn max_in_flight(mut self, n: usize) -> Self {
        self.batch.config.max_in_flight = n;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.batch.config.poll_interval_ms = ms;
        self
    }

    pub fn temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.batch.config.temp_root = Some(root.into());
        self
    }

    pub fn build_raw(self) -> RawBatchFile {
        self.batch
    }

    pub fn build(self) -> BatchFile {
        BatchFile::try_from(self.batch).expect("Failed to build valid batch from builder")
    }
}

impl Default for BatchFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskSpec`.
pub struct TaskSpecBuilder {
    task: TaskSpec,
}

impl TaskSpecBuilder {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            task: TaskSpec {
                args: args.into_iter().map(Into::into).collect(),
                cwd: None,
                env: BTreeMap::new(),
            },
        }
    }

    /// `sh -c <script>`.
    pub fn shell(script: &str) -> Self {
        Self::new(["sh", "-c", script])
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.task.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.task.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> TaskSpec {
        self.task
    }
}
