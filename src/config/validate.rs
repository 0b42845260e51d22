// src/config/validate.rs

use crate::config::model::{BatchFile, RawBatchFile};
use crate::errors::{BatchError, Result};

impl TryFrom<RawBatchFile> for BatchFile {
    type Error = BatchError;

    fn try_from(raw: RawBatchFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_batch(&raw)?;
        Ok(BatchFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_batch(raw: &RawBatchFile) -> Result<()> {
    ensure_has_tasks(raw)?;
    validate_global_config(raw)?;
    validate_task_args(raw)?;
    Ok(())
}

fn ensure_has_tasks(raw: &RawBatchFile) -> Result<()> {
    if raw.task.is_empty() {
        return Err(BatchError::ConfigError(
            "batch file must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(raw: &RawBatchFile) -> Result<()> {
    if raw.config.max_in_flight == 0 {
        return Err(BatchError::ConfigError(
            "[config].max_in_flight must be >= 1 (got 0)".to_string(),
        ));
    }
    if raw.config.poll_interval_ms == 0 {
        return Err(BatchError::ConfigError(
            "[config].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_args(raw: &RawBatchFile) -> Result<()> {
    for (idx, task) in raw.task.iter().enumerate() {
        match task.args.first() {
            None => {
                return Err(BatchError::ConfigError(format!(
                    "task {idx} has an empty `args` list"
                )));
            }
            Some(program) if program.trim().is_empty() => {
                return Err(BatchError::ConfigError(format!(
                    "task {idx} has an empty program name"
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
