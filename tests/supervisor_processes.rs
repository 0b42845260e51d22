// tests/supervisor_processes.rs
//
// End-to-end runs against real processes on Tokio's blocking pool.

#![cfg(unix)]

mod common;
use crate::common::{entries, init_tracing, sh, with_timeout, CollectingSink, TestResult};

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use batchrun::engine::{Supervisor, SupervisorOptions};
use batchrun::exec::{BlockingPool, ExternalTask, TaskOutcome};
use tempfile::tempdir;

fn options(max_in_flight: usize, temp_root: &std::path::Path) -> SupervisorOptions {
    SupervisorOptions {
        max_in_flight,
        poll_interval: Duration::from_millis(10),
        keep_line_ends: false,
        temp_root: Some(temp_root.to_path_buf()),
    }
}

#[tokio::test]
async fn lines_arrive_while_the_process_is_still_running() -> TestResult {
    init_tracing();
    let root = tempdir()?;
    let tasks = vec![sh("echo early; sleep 1; echo late")];

    // Remember when each line reached the sink.
    let seen: Arc<Mutex<Vec<(String, Instant)>>> = Arc::default();
    let seen_in_sink = Arc::clone(&seen);
    let mut sink = move |line: String| {
        seen_in_sink.lock().unwrap().push((line, Instant::now()));
    };

    let mut supervisor = Supervisor::new(BlockingPool::current(), tasks, options(1, root.path()))?;
    let report = with_timeout(supervisor.run(&mut sink)).await?;
    assert!(report.all_succeeded());

    let seen = seen.lock().unwrap();
    let lines: Vec<&str> = seen.iter().map(|(l, _)| l.as_str()).collect();
    assert_eq!(lines, vec!["[0] OUT early", "[0] OUT late", "[0] SUCCESS"]);

    let early_at = seen[0].1;
    let late_at = seen[1].1;
    assert!(
        late_at.duration_since(early_at) >= Duration::from_millis(500),
        "early line should be delivered well before the process exits"
    );
    Ok(())
}

#[tokio::test]
async fn mixed_batch_is_fully_partitioned() -> TestResult {
    init_tracing();
    let root = tempdir()?;
    let tasks = vec![
        sh("exit 0"),
        sh("exit 1"),
        ExternalTask::new(["batchrun-definitely-not-a-real-program"])?,
        sh("echo ok"),
        sh("kill -9 $$"),
    ];

    let mut supervisor = Supervisor::new(BlockingPool::current(), tasks, options(2, root.path()))?;
    let mut sink = CollectingSink::new();
    let report = with_timeout(supervisor.run(&mut sink)).await?;

    assert_eq!(report.succeeded.iter().copied().collect::<Vec<_>>(), vec![0, 3]);
    assert_eq!(report.failed.iter().copied().collect::<Vec<_>>(), vec![1, 2, 4]);
    assert!(report.succeeded.is_disjoint(&report.failed));
    assert_eq!(report.outcomes[1], TaskOutcome::Exited(1));
    assert_eq!(report.outcomes[4], TaskOutcome::Exited(-1));

    for idx in 0..5 {
        let status = sink
            .lines_for(idx)
            .into_iter()
            .filter(|l| l.ends_with("SUCCESS") || l.ends_with("FAILURE"))
            .count();
        assert_eq!(status, 1, "task {idx} must report exactly one status");
    }

    assert!(entries(root.path()).is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_tasks_overlap_up_to_the_cap() -> TestResult {
    init_tracing();
    let root = tempdir()?;
    let tasks: Vec<ExternalTask> = (0..4).map(|_| sh("sleep 0.3")).collect();

    let started = Instant::now();
    let mut supervisor = Supervisor::new(BlockingPool::current(), tasks, options(4, root.path()))?;
    let mut sink = CollectingSink::new();
    let report = with_timeout(supervisor.run(&mut sink)).await?;

    assert_eq!(report.succeeded.len(), 4);
    // Serial execution would need at least 1.2s.
    assert!(started.elapsed() < Duration::from_millis(1100));
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn truncated_output_file_fails_the_task() -> TestResult {
    init_tracing();
    let root = tempdir()?;
    let tasks = vec![sh(
        "echo aaaaaaaa; sleep 0.3; truncate -s 0 /proc/$$/fd/1; sleep 0.3; echo b",
    )];

    let mut supervisor = Supervisor::new(BlockingPool::current(), tasks, options(1, root.path()))?;
    let mut sink = CollectingSink::new();
    let report = with_timeout(supervisor.run(&mut sink)).await?;

    assert_eq!(
        sink.lines(),
        vec!["[0] OUT aaaaaaaa".to_string(), "[0] FAILURE".to_string()]
    );
    // The process itself exited cleanly; the read fault decides the status.
    assert_eq!(report.outcomes[0], TaskOutcome::Exited(0));
    assert!(report.failed.contains(&0));
    assert!(report.succeeded.is_empty());
    let fault = report.output_faults.get(&0).ok_or("no output fault recorded")?;
    assert!(fault.contains("truncated"), "unexpected fault: {fault}");
    assert!(entries(root.path()).is_empty());
    Ok(())
}
