// tests/external_task.rs

mod common;
use crate::common::{init_tracing, sh, TestResult};

use std::fs;

use batchrun::errors::BatchError;
use batchrun::exec::{ExternalTask, TaskOutcome};
use tempfile::tempdir;

#[test]
fn empty_argv_is_rejected() {
    let res = ExternalTask::new(Vec::<String>::new());
    assert!(matches!(res, Err(BatchError::EmptyCommand)));
}

#[test]
fn new_task_is_pending_without_paths() -> TestResult {
    let task = ExternalTask::new(["echo", "hi"])?;
    assert_eq!(task.argv(), ["echo", "hi"]);
    assert_eq!(task.outcome(), &TaskOutcome::Pending);
    assert!(!task.has_exited());
    assert!(task.stdout_path().is_none());
    assert!(task.stderr_path().is_none());
    Ok(())
}

#[test]
fn output_paths_are_write_once() -> TestResult {
    let dir = tempdir()?;
    let mut task = ExternalTask::new(["true"])?;

    task.assign_output_paths(dir.path().join("o"), dir.path().join("e"))?;
    assert_eq!(task.stdout_path(), Some(dir.path().join("o").as_path()));

    let again = task.assign_output_paths(dir.path().join("o2"), dir.path().join("e2"));
    assert!(matches!(again, Err(BatchError::OutputPathsAlreadyAssigned)));
    assert_eq!(task.stderr_path(), Some(dir.path().join("e").as_path()));
    Ok(())
}

#[test]
fn execute_without_paths_fails() -> TestResult {
    let mut task = ExternalTask::new(["true"])?;
    assert!(matches!(
        task.execute(),
        Err(BatchError::OutputPathsNotAssigned)
    ));
    assert!(matches!(
        task.prepare(),
        Err(BatchError::OutputPathsNotAssigned)
    ));
    assert!(!task.has_exited());
    Ok(())
}

#[test]
fn unspawnable_command_is_recorded_as_faulted() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let mut task = ExternalTask::new(["batchrun-definitely-not-a-real-program"])?;
    task.assign_output_paths(dir.path().join("o"), dir.path().join("e"))?;

    let outcome = task.execute()?.clone();
    assert!(matches!(outcome, TaskOutcome::Faulted(ref msg) if msg.contains("spawning")));
    assert!(task.has_exited());
    assert!(!task.outcome().is_success());
    Ok(())
}

#[cfg(unix)]
#[test]
fn execute_redirects_output_and_records_exit_code() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let out = dir.path().join("o");
    let err = dir.path().join("e");

    let mut task = sh("echo hello; echo oops >&2; exit 3");
    task.assign_output_paths(&out, &err)?;

    assert_eq!(task.execute()?, &TaskOutcome::Exited(3));
    assert!(task.has_exited());
    assert_eq!(fs::read_to_string(&out)?, "hello\n");
    assert_eq!(fs::read_to_string(&err)?, "oops\n");
    Ok(())
}

#[cfg(unix)]
#[test]
fn arguments_are_not_reinterpreted_by_a_shell() -> TestResult {
    let dir = tempdir()?;
    let out = dir.path().join("o");

    let mut task = ExternalTask::new(["echo", "a  b", "$HOME", "*"])?;
    task.assign_output_paths(&out, dir.path().join("e"))?;
    assert_eq!(task.execute()?, &TaskOutcome::Exited(0));
    assert_eq!(fs::read_to_string(&out)?, "a  b $HOME *\n");
    Ok(())
}

#[cfg(unix)]
#[test]
fn cwd_and_env_are_applied() -> TestResult {
    let dir = tempdir()?;
    let work = tempdir()?;
    let out = dir.path().join("o");

    let mut task = sh("pwd; echo \"$BATCHRUN_TEST_VAR\"")
        .with_current_dir(work.path())
        .with_env("BATCHRUN_TEST_VAR", "from-env");
    task.assign_output_paths(&out, dir.path().join("e"))?;
    task.execute()?;

    let text = fs::read_to_string(&out)?;
    let mut lines = text.lines();
    let pwd = fs::canonicalize(lines.next().unwrap_or_default())?;
    assert_eq!(pwd, fs::canonicalize(work.path())?);
    assert_eq!(lines.next(), Some("from-env"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn prepared_invocation_runs_on_another_thread() -> TestResult {
    let dir = tempdir()?;
    let mut task = sh("exit 0");
    task.assign_output_paths(dir.path().join("o"), dir.path().join("e"))?;

    let invocation = task.prepare()?;
    assert_eq!(invocation.task(), None);
    let invocation = invocation.for_task(3);
    assert_eq!(invocation.task(), Some(3));
    assert_eq!(invocation.command_line(), "sh -c exit 0");
    let outcome = std::thread::spawn(move || invocation.run())
        .join()
        .expect("runner thread panicked");
    task.record_outcome(outcome);

    assert!(task.outcome().is_success());
    Ok(())
}
