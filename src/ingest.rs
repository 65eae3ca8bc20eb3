//! Event ingestion: turn raw events into tracking table mutations.

use std::path::{Component, Path, PathBuf};
use tokio::time::Instant;

use crate::events::RawEvent;
use crate::table::TrackingTable;

/// What a single event did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    Touched,
    Removed,
    /// A removal for a path that was not being tracked.
    Untracked,
}

/// Lexically clean `path` so one file always maps to one key.
///
/// Relative paths are resolved against `base`. `.` components are dropped and
/// `..` pops the preceding normal component; nothing is read from disk, so
/// symlinks are left alone.
pub fn clean_path(base: &Path, path: &Path) -> PathBuf {
    let joined;
    let path = if path.is_absolute() {
        path
    } else {
        joined = base.join(path);
        &joined
    };

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root.
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Apply one event to the table.
pub fn ingest(table: &mut TrackingTable, base: &Path, event: &RawEvent, now: Instant) -> Ingested {
    let path = clean_path(base, &event.path);
    if event.kind.is_touch() {
        tracing::debug!("{:?}: {}", event.kind, path.display());
        table.touch(path, now);
        Ingested::Touched
    } else if table.remove(&path) {
        tracing::debug!("{:?}: {} no longer tracked", event.kind, path.display());
        Ingested::Removed
    } else {
        Ingested::Untracked
    }
}
