//! Error types for the stability watcher
//!
//! Only startup can fail. Once the coordinator is running, problems reported
//! by the event source are logged and the loop keeps going.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by an event source, either while subscribing or at runtime.
pub type SourceError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot resolve monitored path {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create event source: {0}")]
    SourceInit(#[source] SourceError),

    #[error("failed to subscribe to {path}: {source}")]
    Subscribe {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    #[error("failed to enumerate {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = WatchError> = std::result::Result<T, E>;
