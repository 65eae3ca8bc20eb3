use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::WatcherConfig;
use crate::coordinator::Coordinator;
use crate::error::{Result, WatchError};
use crate::poller::Poller;
use crate::source::{EventSource, NotifySource, SourceChannels};
use crate::table::TrackingTable;

/// Reports files in a directory once they have stopped changing.
pub struct StabilityWatcher {
    config: WatcherConfig,
}

impl StabilityWatcher {
    pub fn new(config: WatcherConfig) -> Result<Self> {
        config.validate().map_err(WatchError::Config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Start watching with native OS notifications.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> Result<StableFiles> {
        let (source, channels) = NotifySource::new()?;
        self.start_with_source(source, channels)
    }

    /// Start watching with the given event source.
    ///
    /// Resolves the monitored directory, subscribes, records every existing
    /// entry as touched now, then hands all of it to the coordinator task.
    /// Any failure up to that point is returned and nothing keeps running.
    pub fn start_with_source<S: EventSource>(
        self,
        mut source: S,
        channels: SourceChannels,
    ) -> Result<StableFiles> {
        let requested = &self.config.monitored_path;
        let root = requested.canonicalize().map_err(|source| WatchError::Resolve {
            path: requested.clone(),
            source,
        })?;

        // Subscribe before scanning so nothing created in between goes unseen.
        source.subscribe(&root).map_err(|source| WatchError::Subscribe {
            path: root.clone(),
            source,
        })?;

        let start = Instant::now();
        let table = bootstrap_scan(&root, start)?;
        tracing::info!(
            "watching {} ({} existing entries, poll {:?}, stable after {:?})",
            root.display(),
            table.len(),
            self.config.poll_interval(),
            self.config.stable_duration(),
        );

        let (output, rx) = mpsc::channel(self.config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let coordinator = Coordinator {
            root: root.clone(),
            table,
            source,
            channels,
            poller: Poller::new(start, self.config.poll_interval(), self.config.stable_duration()),
            output,
            shutdown: shutdown_rx,
            resubscribe: self.config.resubscribe,
        };
        let task = tokio::spawn(coordinator.run());

        Ok(StableFiles {
            root,
            rx,
            shutdown: Shutdown {
                tx: Arc::new(shutdown_tx),
            },
            task,
        })
    }
}

/// Track every immediate child of `root` as touched at `now`.
fn bootstrap_scan(root: &Path, now: Instant) -> Result<TrackingTable> {
    let scan_err = |source: std::io::Error| WatchError::Scan {
        path: root.to_path_buf(),
        source,
    };

    let mut table = TrackingTable::new();
    for entry in std::fs::read_dir(root).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        table.touch(entry.path(), now);
    }
    Ok(table)
}

/// Stops a running watcher. Cloneable so it can be handed to a signal handler.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

/// The consumer side of a running watcher: a bounded queue of stable paths.
///
/// Dropping it stops the watcher.
pub struct StableFiles {
    root: PathBuf,
    rx: mpsc::Receiver<PathBuf>,
    shutdown: Shutdown,
    task: JoinHandle<()>,
}

impl StableFiles {
    /// Canonical form of the watched directory. Every emitted path is under it.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Next stable path, or `None` once the watcher has stopped.
    pub async fn recv(&mut self) -> Option<PathBuf> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<PathBuf, TryRecvError> {
        self.rx.try_recv()
    }

    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Stop the watcher and wait for its task to release the subscription.
    pub async fn shutdown(self) {
        self.shutdown.trigger();
        drop(self.rx);
        if let Err(err) = self.task.await {
            tracing::warn!("watcher task ended abnormally: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ManualSource;

    #[test]
    fn test_invalid_config_rejected() {
        let config = WatcherConfig::new("/tmp").with_queue_capacity(0);
        assert!(matches!(StabilityWatcher::new(config), Err(WatchError::Config(_))));
    }

    #[test]
    fn test_bootstrap_scan_lists_children_only() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("deep.txt"), "d").unwrap();

        let now = Instant::now();
        let table = bootstrap_scan(dir.path(), now).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.last_touched(&dir.path().join("a.txt")), Some(now));
        assert!(table.contains(&dir.path().join("sub")));
        assert!(!table.contains(&dir.path().join("sub").join("deep.txt")));
    }

    #[test]
    fn test_bootstrap_scan_missing_dir_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = bootstrap_scan(&dir.path().join("missing"), Instant::now());
        assert!(matches!(result, Err(WatchError::Scan { .. })));
    }

    #[tokio::test]
    async fn test_missing_directory_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let (source, _feed, channels) = ManualSource::new();
        let watcher = StabilityWatcher::new(WatcherConfig::new(dir.path().join("missing"))).unwrap();

        let result = watcher.start_with_source(source, channels);
        assert!(matches!(result, Err(WatchError::Resolve { .. })));
    }

    #[tokio::test]
    async fn test_subscribe_failure_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let (source, feed, channels) = ManualSource::new();
        feed.fail_subscribe(true);
        let watcher = StabilityWatcher::new(WatcherConfig::new(dir.path())).unwrap();

        let result = watcher.start_with_source(source, channels);
        assert!(matches!(result, Err(WatchError::Subscribe { .. })));
    }
}
