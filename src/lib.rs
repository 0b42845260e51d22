// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod output;

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate};
use crate::config::model::BatchFile;
use crate::engine::{StdoutSink, Supervisor, SupervisorOptions};
use crate::exec::BlockingPool;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - batch file loading and CLI overrides
/// - the blocking worker pool
/// - the supervisor, printing every event on stdout
///
/// Returns `Ok(true)` if every task succeeded.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let batch = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&batch);
        return Ok(true);
    }

    let options = apply_overrides(batch.supervisor_options(), &args);
    let tasks = batch.tasks()?;
    info!(
        config = %config_path.display(),
        tasks = tasks.len(),
        max_in_flight = options.max_in_flight,
        "running batch"
    );

    let pool = BlockingPool::current();
    let mut supervisor = Supervisor::new(pool, tasks, options)?;
    let report = supervisor.run(&mut StdoutSink).await?;

    if !report.all_succeeded() {
        info!(failed = ?report.failed, "some tasks failed");
    }
    Ok(report.all_succeeded())
}

/// Apply `--max-in-flight`, `--poll-interval-ms` and `--keep-line-ends` on
/// top of the batch file's `[config]`.
pub fn apply_overrides(mut options: SupervisorOptions, args: &CliArgs) -> SupervisorOptions {
    if let Some(n) = args.max_in_flight {
        options.max_in_flight = n;
    }
    if let Some(ms) = args.poll_interval_ms {
        options.poll_interval = Duration::from_millis(ms);
    }
    if args.keep_line_ends {
        options.keep_line_ends = true;
    }
    options
}

/// Simple dry-run output: print config and the commands in order.
fn print_dry_run(batch: &BatchFile) {
    println!("batchrun dry-run");
    println!("  config.max_in_flight = {}", batch.config.max_in_flight);
    println!("  config.poll_interval_ms = {}", batch.config.poll_interval_ms);
    println!("  config.keep_line_ends = {}", batch.config.keep_line_ends);
    if let Some(ref root) = batch.config.temp_root {
        println!("  config.temp_root = {}", root.display());
    }
    println!();

    println!("tasks ({}):", batch.task.len());
    for (idx, task) in batch.task.iter().enumerate() {
        println!("  [{idx}] {:?}", task.args);
        if let Some(ref cwd) = task.cwd {
            println!("      cwd: {}", cwd.display());
        }
        if !task.env.is_empty() {
            println!("      env: {:?}", task.env);
        }
    }

    debug!("dry-run complete (no execution)");
}
