//! Event sources: where raw filesystem events come from.
//!
//! A source is anything that can subscribe to a directory and deliver
//! [`RawEvent`]s plus runtime errors on a pair of channels. The coordinator
//! owns the source for its whole life so it can unsubscribe on shutdown or
//! resubscribe after an error.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{SourceError, WatchError};
use crate::events::{self, RawEvent, RawEventKind};

pub trait EventSource: Send + 'static {
    /// Start delivering events for the immediate children of `dir`.
    fn subscribe(&mut self, dir: &Path) -> Result<(), SourceError>;

    fn unsubscribe(&mut self, dir: &Path) -> Result<(), SourceError>;
}

/// Receiving ends of an event source.
pub struct SourceChannels {
    pub events: UnboundedReceiver<RawEvent>,
    pub errors: UnboundedReceiver<SourceError>,
}

impl SourceChannels {
    fn pair() -> (UnboundedSender<RawEvent>, UnboundedSender<SourceError>, Self) {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (error_tx, errors) = mpsc::unbounded_channel();
        (event_tx, error_tx, Self { events, errors })
    }
}

/// Native OS notifications through `notify`, watching non-recursively.
pub struct NotifySource {
    watcher: RecommendedWatcher,
}

impl NotifySource {
    pub fn new() -> Result<(Self, SourceChannels), WatchError> {
        let (event_tx, error_tx, channels) = SourceChannels::pair();

        // Runs on notify's own thread. Send failures mean the coordinator is
        // gone, and there is nobody left to tell.
        let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            match result {
                Ok(event) => {
                    for raw in events::from_notify(event) {
                        let _ = event_tx.send(raw);
                    }
                }
                Err(err) => {
                    let _ = error_tx.send(Box::new(err));
                }
            }
        })
        .map_err(|err| WatchError::SourceInit(Box::new(err)))?;

        Ok((Self { watcher }, channels))
    }
}

impl EventSource for NotifySource {
    fn subscribe(&mut self, dir: &Path) -> Result<(), SourceError> {
        self.watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    fn unsubscribe(&mut self, dir: &Path) -> Result<(), SourceError> {
        self.watcher.unwatch(dir)?;
        Ok(())
    }
}

/// A source fed by hand through a [`ManualFeed`].
///
/// For embedding a notification facility other than `notify`, and for
/// driving the coordinator deterministically in tests.
pub struct ManualSource {
    fail_subscribe: Arc<AtomicBool>,
    subscriptions: Arc<AtomicUsize>,
    unsubscriptions: Arc<AtomicUsize>,
}

#[derive(Clone)]
pub struct ManualFeed {
    events: UnboundedSender<RawEvent>,
    errors: UnboundedSender<SourceError>,
    fail_subscribe: Arc<AtomicBool>,
    subscriptions: Arc<AtomicUsize>,
    unsubscriptions: Arc<AtomicUsize>,
}

impl ManualSource {
    pub fn new() -> (Self, ManualFeed, SourceChannels) {
        let (events, errors, channels) = SourceChannels::pair();
        let fail_subscribe = Arc::new(AtomicBool::new(false));
        let subscriptions = Arc::new(AtomicUsize::new(0));
        let unsubscriptions = Arc::new(AtomicUsize::new(0));

        let source = Self {
            fail_subscribe: fail_subscribe.clone(),
            subscriptions: subscriptions.clone(),
            unsubscriptions: unsubscriptions.clone(),
        };
        let feed = ManualFeed {
            events,
            errors,
            fail_subscribe,
            subscriptions,
            unsubscriptions,
        };
        (source, feed, channels)
    }
}

impl EventSource for ManualSource {
    fn subscribe(&mut self, dir: &Path) -> Result<(), SourceError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(format!("subscription to {} refused", dir.display()).into());
        }
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unsubscribe(&mut self, _dir: &Path) -> Result<(), SourceError> {
        self.unsubscriptions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl ManualFeed {
    /// Returns false once the coordinator has gone away.
    pub fn push(&self, event: RawEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn event(&self, path: impl Into<std::path::PathBuf>, kind: RawEventKind) -> bool {
        self.push(RawEvent::new(path, kind))
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        let message: String = message.into();
        self.errors.send(message.into()).is_ok()
    }

    /// Make every later `subscribe` call fail.
    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// Number of successful subscriptions so far.
    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    /// Number of `unsubscribe` calls so far.
    pub fn unsubscriptions(&self) -> usize {
        self.unsubscriptions.load(Ordering::SeqCst)
    }
}
