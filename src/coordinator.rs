//! The coordinator loop.
//!
//! One task owns the tracking table, the event source and the poller, and
//! handles exactly one input at a time: an event, a source error, a poll tick
//! or shutdown. Nothing else ever sees the table, so it needs no lock.
//!
//! Stable paths are emitted with a blocking send on a bounded queue from
//! inside this loop. When the consumer falls behind and the queue fills, the
//! loop waits, and while it waits no events are ingested and no sweeps run.
//! Events keep buffering in the source channels meanwhile, so nothing is lost,
//! but timestamps recorded after the stall reflect when the event was handled
//! rather than when it happened.

use std::path::PathBuf;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::config::ResubscribePolicy;
use crate::error::SourceError;
use crate::ingest::{self, Ingested};
use crate::poller::Poller;
use crate::source::{EventSource, SourceChannels};
use crate::table::TrackingTable;

pub(crate) struct Coordinator<S: EventSource> {
    pub root: PathBuf,
    pub table: TrackingTable,
    pub source: S,
    pub channels: SourceChannels,
    pub poller: Poller,
    pub output: mpsc::Sender<PathBuf>,
    pub shutdown: watch::Receiver<bool>,
    pub resubscribe: ResubscribePolicy,
}

enum Flow {
    Continue,
    Stop,
}

impl<S: EventSource> Coordinator<S> {
    pub async fn run(mut self) {
        let mut events_open = true;
        let mut errors_open = true;

        loop {
            let flow = tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::debug!("shutdown requested");
                    Flow::Stop
                }
                _ = self.output.closed() => {
                    tracing::info!("stable-file queue dropped by consumer");
                    Flow::Stop
                }
                event = self.channels.events.recv(), if events_open => {
                    match event {
                        Some(event) => {
                            let outcome = ingest::ingest(&mut self.table, &self.root, &event, Instant::now());
                            if outcome == Ingested::Untracked {
                                tracing::trace!("{:?} for untracked {}", event.kind, event.path.display());
                            }
                        }
                        None => {
                            tracing::warn!("event source closed; tracked files will still be swept");
                            events_open = false;
                        }
                    }
                    Flow::Continue
                }
                err = self.channels.errors.recv(), if errors_open => {
                    match err {
                        Some(err) => self.on_source_error(err),
                        None => errors_open = false,
                    }
                    Flow::Continue
                }
                now = self.poller.tick() => self.emit_stable(now).await,
            };

            if let Flow::Stop = flow {
                break;
            }
        }

        if let Err(err) = self.source.unsubscribe(&self.root) {
            tracing::debug!("unsubscribe from {} failed: {}", self.root.display(), err);
        }
        tracing::info!("stopped watching {}", self.root.display());
    }

    async fn emit_stable(&mut self, now: Instant) -> Flow {
        let stable = self.poller.sweep(&mut self.table, now);

        for path in stable {
            tracing::debug!("stable: {}", path.display());
            tokio::select! {
                sent = self.output.send(path) => {
                    if sent.is_err() {
                        tracing::info!("stable-file queue dropped by consumer");
                        return Flow::Stop;
                    }
                }
                _ = self.shutdown.changed() => return Flow::Stop,
            }
        }
        Flow::Continue
    }

    fn on_source_error(&mut self, err: SourceError) {
        tracing::warn!("event source error on {}: {}", self.root.display(), err);

        if self.resubscribe == ResubscribePolicy::OnError {
            if let Err(err) = self.source.unsubscribe(&self.root) {
                tracing::debug!("unsubscribe from {} failed: {}", self.root.display(), err);
            }
            match self.source.subscribe(&self.root) {
                Ok(()) => tracing::info!("resubscribed to {}", self.root.display()),
                Err(err) => tracing::warn!("resubscribe to {} failed: {}", self.root.display(), err),
            }
        }
    }
}
