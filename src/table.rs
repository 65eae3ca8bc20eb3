//! Tracking table: the set of files that have been touched but are not yet stable.
//!
//! The table does no locking. It is owned by the coordinator task and never
//! handed to any other context, which is what makes that safe.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
pub struct TrackingTable {
    files: HashMap<PathBuf, Instant>,
}

impl TrackingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record activity on `path` at `now`. A touch never moves an entry's
    /// timestamp backwards.
    pub fn touch(&mut self, path: PathBuf, now: Instant) {
        self.files
            .entry(path)
            .and_modify(|last| *last = (*last).max(now))
            .or_insert(now);
    }

    /// Forget `path`. Returns whether it was tracked.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.files.remove(path).is_some()
    }

    /// Remove and return every path whose last touch is at least
    /// `stable_for` before `now`.
    pub fn sweep(&mut self, now: Instant, stable_for: Duration) -> Vec<PathBuf> {
        let mut stable = Vec::new();
        self.files.retain(|path, last| {
            if now.saturating_duration_since(*last) >= stable_for {
                stable.push(path.clone());
                false
            } else {
                true
            }
        });
        stable
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn last_touched(&self, path: &Path) -> Option<Instant> {
        self.files.get(path).copied()
    }
}
