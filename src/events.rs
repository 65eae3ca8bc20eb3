use std::path::PathBuf;
use notify::event::{EventKind, ModifyKind, RenameMode};
use serde::{Deserialize, Serialize};

/// The operations the coordinator understands. Everything else a platform
/// reports is dropped during translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawEventKind {
    Created,
    Written,
    AttributeChanged,
    Removed,
    /// The old name of a rename. The new name arrives separately as `Created`.
    RenamedAway,
}

impl RawEventKind {
    /// Created, written and attribute changes reset a file's timer.
    pub fn is_touch(self) -> bool {
        matches!(self, Self::Created | Self::Written | Self::AttributeChanged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub path: PathBuf,
    pub kind: RawEventKind,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, kind: RawEventKind) -> Self {
        Self { path: path.into(), kind }
    }
}

/// Translate one notify event into the raw events it implies.
///
/// A `Name(Both)` rename becomes a removal of the first path and a creation
/// of the second; the two are never correlated further.
pub fn from_notify(event: notify::Event) -> Vec<RawEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => RawEventKind::Created,
        EventKind::Remove(_) => RawEventKind::Removed,
        EventKind::Modify(ModifyKind::Metadata(_)) => RawEventKind::AttributeChanged,
        EventKind::Modify(ModifyKind::Name(mode)) => return from_rename(mode, event.paths),
        EventKind::Modify(_) => RawEventKind::Written,
        other => {
            tracing::trace!("ignoring {:?} on {:?}", other, event.paths);
            return Vec::new();
        }
    };

    event
        .paths
        .into_iter()
        .map(|path| RawEvent::new(path, kind))
        .collect()
}

fn from_rename(mode: RenameMode, paths: Vec<PathBuf>) -> Vec<RawEvent> {
    match mode {
        RenameMode::From => paths
            .into_iter()
            .map(|p| RawEvent::new(p, RawEventKind::RenamedAway))
            .collect(),
        RenameMode::To => paths
            .into_iter()
            .map(|p| RawEvent::new(p, RawEventKind::Created))
            .collect(),
        RenameMode::Both => {
            let mut paths = paths.into_iter();
            let mut out = Vec::with_capacity(2);
            if let Some(from) = paths.next() {
                out.push(RawEvent::new(from, RawEventKind::RenamedAway));
            }
            if let Some(to) = paths.next() {
                out.push(RawEvent::new(to, RawEventKind::Created));
            }
            out
        }
        // Some backends (FSEvents, polling) cannot tell which side of the
        // rename a path is on, so ask the filesystem.
        RenameMode::Any | RenameMode::Other => paths
            .into_iter()
            .map(|p| {
                let kind = if p.exists() {
                    RawEventKind::Created
                } else {
                    RawEventKind::RenamedAway
                };
                RawEvent::new(p, kind)
            })
            .collect(),
    }
}
