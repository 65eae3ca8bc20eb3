use std::path::PathBuf;
use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::config::{ResubscribePolicy, WatcherConfig};

#[derive(Parser)]
#[command(name = "stablewatch")]
#[command(version)]
#[command(about = "Report files in a directory once they have stopped changing")]
#[command(long_about = "stablewatch watches a single directory (not recursively) and prints each file once it has gone untouched for the configured duration. Use it to hold back processing of uploads, batch drops or rotated logs until they are fully written.")]
pub struct Cli {
    /// Directory to watch for changes
    #[arg(value_name = "PATH", help = "Path to watch (defaults to current directory)")]
    pub path: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE", help = "Load settings from a TOML file")]
    pub config: Option<PathBuf>,

    /// Time between stability sweeps
    #[arg(long, value_name = "MS", help = "Sweep interval in ms")]
    pub poll_interval: Option<u64>,

    /// Quiescence threshold
    #[arg(long, value_name = "MS", help = "Report a file after this many ms without activity")]
    pub stable_for: Option<u64>,

    /// Output queue bound
    #[arg(long, value_name = "N", help = "Stable paths buffered before the watcher blocks")]
    pub queue_capacity: Option<usize>,

    /// Reaction to event source errors
    #[arg(long, help = "Resubscription policy after an event source error")]
    pub resubscribe: Option<ResubscribePolicy>,

    /// Output format
    #[arg(short, long, default_value = "text", help = "Output format")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Timestamped plain text
    Text,
    /// One JSON object per line for scripting
    Json,
}

impl Cli {
    /// Merge defaults, the config file, the environment and flags, in that order.
    pub fn watcher_config(&self) -> Result<WatcherConfig> {
        let base = match &self.config {
            Some(path) => WatcherConfig::load(path)?,
            None => WatcherConfig::default(),
        };
        let mut config = base.apply_env();

        if let Some(path) = &self.path {
            config.monitored_path = path.clone();
        }
        if let Some(ms) = self.poll_interval {
            config.poll_interval_ms = ms;
        }
        if let Some(ms) = self.stable_for {
            config.stable_duration_ms = ms;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(policy) = self.resubscribe {
            config.resubscribe = policy;
        }

        Ok(config)
    }

    pub fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }

    pub fn validate(config: &WatcherConfig) -> Result<(), String> {
        config.validate()?;

        let path = &config.monitored_path;
        if !path.exists() {
            return Err(format!("Path does not exist: {}", path.display()));
        }

        if !path.is_dir() {
            return Err(format!("Path is not a directory: {}", path.display()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "stablewatch",
            "/srv/drop",
            "--poll-interval",
            "250",
            "--stable-for",
            "5000",
            "--resubscribe",
            "on-error",
            "--output",
            "json",
        ]);

        let config = cli.watcher_config().unwrap();
        assert_eq!(config.monitored_path, PathBuf::from("/srv/drop"));
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.stable_duration_ms, 5000);
        assert_eq!(config.resubscribe, ResubscribePolicy::OnError);
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_validate_rejects_file_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(Cli::validate(&WatcherConfig::new(dir.path())).is_ok());
        assert!(Cli::validate(&WatcherConfig::new(&file)).is_err());
        assert!(Cli::validate(&WatcherConfig::new(dir.path().join("nope"))).is_err());
    }
}
