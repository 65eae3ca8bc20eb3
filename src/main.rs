use std::path::PathBuf;
use anyhow::Result;
use chrono::{DateTime, Local};
use clap::Parser;
use serde::Serialize;

use stablewatch::{
    cli::{Cli, OutputFormat},
    StabilityWatcher,
};

#[derive(Serialize)]
struct StableRecord {
    path: PathBuf,
    stable_at: DateTime<Local>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.setup_logging();

    let config = cli.watcher_config()?;
    if let Err(err) = Cli::validate(&config) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    let watcher = StabilityWatcher::new(config)?;
    let mut stable = watcher.start()?;
    tracing::info!("Starting stablewatch on: {}", stable.root().display());

    let shutdown = stable.shutdown_handle();
    ctrlc::set_handler(move || {
        shutdown.trigger();
    })?;

    // Ends once the watcher stops and the queue has been drained.
    while let Some(path) = stable.recv().await {
        print_stable(path, cli.output)?;
    }

    stable.shutdown().await;
    Ok(())
}

fn print_stable(path: PathBuf, format: OutputFormat) -> Result<()> {
    let record = StableRecord {
        path,
        stable_at: Local::now(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&record)?),
        OutputFormat::Text => println!(
            "[{}] STABLE {}",
            record.stable_at.format("%H:%M:%S"),
            record.path.display()
        ),
    }
    Ok(())
}
