// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `batchrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "batchrun",
    version,
    about = "Run a batch of commands with bounded concurrency and live output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the batch file (TOML).
    ///
    /// Default: `Batchrun.toml` in the current working directory.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override `[config].max_in_flight`.
    #[arg(long, value_name = "N")]
    pub max_in_flight: Option<usize>,

    /// Override `[config].poll_interval_ms`.
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Deliver output lines with their line terminators.
    #[arg(long)]
    pub keep_line_ends: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BATCHRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the batch, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
