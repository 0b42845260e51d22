// src/main.rs

use batchrun::{cli, logging, run};

/// Exit code used when the batch ran but at least one task failed.
const EXIT_TASKS_FAILED: i32 = 2;

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(EXIT_TASKS_FAILED),
        Err(err) => {
            eprintln!("batchrun error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
