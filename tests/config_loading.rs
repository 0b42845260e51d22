// tests/config_loading.rs

mod common;
use crate::common::{init_tracing, TestResult};

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use batchrun::config::{load_and_validate, BatchFile};
use batchrun::errors::BatchError;
use batchrun_test_utils::builders::{BatchFileBuilder, TaskSpecBuilder};
use tempfile::NamedTempFile;

fn write_batch(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_batch_file_is_parsed() -> TestResult {
    init_tracing();
    let file = write_batch(
        r#"
[config]
max_in_flight = 3
poll_interval_ms = 25
keep_line_ends = true
temp_root = "/tmp/batchrun-test-root"

[[task]]
args = ["pip", "install", "--dry-run", "requests"]

[[task]]
args = ["echo", "hi"]
cwd = "sub/dir"
env = { PIP_NO_INPUT = "1" }
"#,
    );

    let batch = load_and_validate(file.path())?;
    assert_eq!(batch.task.len(), 2);

    let options = batch.supervisor_options();
    assert_eq!(options.max_in_flight, 3);
    assert_eq!(options.poll_interval, Duration::from_millis(25));
    assert!(options.keep_line_ends);
    assert_eq!(options.temp_root, Some(PathBuf::from("/tmp/batchrun-test-root")));

    let tasks = batch.tasks()?;
    assert_eq!(tasks[0].argv(), ["pip", "install", "--dry-run", "requests"]);
    assert_eq!(tasks[1].current_dir(), Some(PathBuf::from("sub/dir").as_path()));
    assert_eq!(tasks[1].env().get("PIP_NO_INPUT").map(String::as_str), Some("1"));
    Ok(())
}

#[test]
fn config_section_is_optional() -> TestResult {
    let file = write_batch(
        r#"
[[task]]
args = ["true"]
"#,
    );

    let batch = load_and_validate(file.path())?;
    assert!(batch.config.max_in_flight >= 1);
    assert_eq!(batch.config.poll_interval_ms, 100);
    assert!(!batch.config.keep_line_ends);
    assert!(batch.config.temp_root.is_none());
    Ok(())
}

#[test]
fn batch_without_tasks_is_rejected() {
    let file = write_batch("[config]\nmax_in_flight = 2\n");

    match load_and_validate(file.path()) {
        Err(BatchError::ConfigError(msg)) => assert!(msg.contains("at least one")),
        other => panic!("expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn empty_args_names_the_task() {
    let file = write_batch(
        r#"
[[task]]
args = ["true"]

[[task]]
args = []
"#,
    );

    match load_and_validate(file.path()) {
        Err(BatchError::ConfigError(msg)) => {
            assert!(msg.contains("task 1"));
            assert!(msg.contains("empty"));
        }
        other => panic!("expected ConfigError, got: {:?}", other),
    }
}

#[test]
fn zero_limits_are_rejected() {
    let raw = BatchFileBuilder::new()
        .with_task(TaskSpecBuilder::new(["true"]).build())
        .max_in_flight(0)
        .build_raw();
    assert!(matches!(
        BatchFile::try_from(raw),
        Err(BatchError::ConfigError(ref m)) if m.contains("max_in_flight")
    ));

    let raw = BatchFileBuilder::new()
        .with_task(TaskSpecBuilder::new(["true"]).build())
        .poll_interval_ms(0)
        .build_raw();
    assert!(matches!(
        BatchFile::try_from(raw),
        Err(BatchError::ConfigError(ref m)) if m.contains("poll_interval_ms")
    ));
}

#[test]
fn single_string_command_is_not_accepted() {
    let file = write_batch(
        r#"
[[task]]
args = "pip install requests"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(BatchError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let res = load_and_validate("/definitely/not/here/Batchrun.toml");
    assert!(matches!(res, Err(BatchError::IoError(_))));
}

#[test]
fn builder_round_trips_into_tasks() -> TestResult {
    let batch = BatchFileBuilder::new()
        .with_task(TaskSpecBuilder::shell("echo one").env("A", "1").build())
        .with_task(TaskSpecBuilder::new(["ls", "-l"]).cwd("/").build())
        .max_in_flight(2)
        .build();

    let tasks = batch.tasks()?;
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].argv(), ["sh", "-c", "echo one"]);
    assert_eq!(tasks[1].current_dir(), Some(std::path::Path::new("/")));
    assert_eq!(batch.supervisor_options().max_in_flight, 2);
    Ok(())
}
