//! Watch a directory and report each file once it has stopped changing.
//!
//! A live stream of filesystem events keeps a per-file "last touched" time up
//! to date, and a periodic sweep hands every file that has been quiet for the
//! configured duration to the consumer through a bounded queue.

pub mod cli;
pub mod config;
mod coordinator;
pub mod error;
pub mod events;
pub mod ingest;
pub mod poller;
pub mod source;
pub mod table;
pub mod watcher;

pub use config::{ResubscribePolicy, WatcherConfig, DEFAULT_QUEUE_CAPACITY};
pub use error::{SourceError, WatchError};
pub use events::{RawEvent, RawEventKind};
pub use source::{EventSource, ManualFeed, ManualSource, NotifySource, SourceChannels};
pub use table::TrackingTable;
pub use watcher::{Shutdown, StabilityWatcher, StableFiles};
