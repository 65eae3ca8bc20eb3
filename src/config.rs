//! Configuration for the stability watcher
//!
//! Values come from defaults, an optional TOML file, `STABLEWATCH_*`
//! environment variables and finally command-line flags, in that order.

use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Capacity of the stable-file queue handed to the consumer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// Configuration for one watched directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Directory to watch (not recursive)
    pub monitored_path: PathBuf,
    /// Time between stability sweeps in milliseconds
    pub poll_interval_ms: u64,
    /// How long a file must go untouched before it is reported, in milliseconds
    pub stable_duration_ms: u64,
    /// Stable paths that may wait unconsumed before the watcher blocks
    pub queue_capacity: usize,
    /// What to do when the event source reports a runtime error
    pub resubscribe: ResubscribePolicy,
}

/// Reaction to a runtime error from the event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResubscribePolicy {
    /// Log the error and carry on with whatever subscription is left
    #[default]
    Never,
    /// Log, then make one attempt to drop and re-establish the subscription
    OnError,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            monitored_path: PathBuf::from("."),
            poll_interval_ms: 1000,
            stable_duration_ms: 3000,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            resubscribe: ResubscribePolicy::Never,
        }
    }
}

impl WatcherConfig {
    pub fn new(monitored_path: impl Into<PathBuf>) -> Self {
        Self {
            monitored_path: monitored_path.into(),
            ..Self::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_stable_duration(mut self, duration: Duration) -> Self {
        self.stable_duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_resubscribe(mut self, policy: ResubscribePolicy) -> Self {
        self.resubscribe = policy;
        self
    }

    /// Get poll interval duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Get stable duration
    pub fn stable_duration(&self) -> Duration {
        Duration::from_millis(self.stable_duration_ms)
    }

    /// Load configuration from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: WatcherConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Override values with environment variables if present
    pub fn apply_env(mut self) -> Self {
        if let Ok(val) = std::env::var("STABLEWATCH_PATH") {
            if !val.is_empty() {
                self.monitored_path = PathBuf::from(val);
            }
        }

        if let Ok(val) = std::env::var("STABLEWATCH_POLL_INTERVAL_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                self.poll_interval_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("STABLEWATCH_STABLE_DURATION_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                self.stable_duration_ms = ms;
            }
        }

        if let Ok(val) = std::env::var("STABLEWATCH_RESUBSCRIBE") {
            if let Ok(policy) = <ResubscribePolicy as ValueEnum>::from_str(&val, true) {
                self.resubscribe = policy;
            }
        }

        if let Ok(val) = std::env::var("STABLEWATCH_QUEUE_CAPACITY") {
            if let Ok(cap) = val.parse::<usize>() {
                self.queue_capacity = cap;
            }
        }

        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.monitored_path.as_os_str().is_empty() {
            return Err("monitored_path must not be empty".to_string());
        }

        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".to_string());
        }

        if self.stable_duration_ms == 0 {
            return Err("stable_duration_ms must be greater than 0".to_string());
        }

        if self.queue_capacity == 0 {
            return Err("queue_capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}
