//! Change-event stream contract
//!
//! The raw file-system-event source (native notifications or polling) is an
//! external collaborator. The engine only depends on the shape of what it
//! produces: a `tokio` mpsc channel of [`StreamItem`]s. Events may be
//! duplicated or reordered across distinct paths but are monotonic per
//! path; a source that drops events must emit [`StreamItem::Overflow`] so
//! the engine can fall back to a full resync instead of trusting partial
//! state.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// What happened to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    /// A file was moved or renamed to this path
    MovedTo,
}

/// A single change notification for one path
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    pub observed_at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Build an event observed right now.
    pub fn now(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            observed_at: Utc::now(),
        }
    }
}

/// One item on the event stream
#[derive(Debug, Clone)]
pub enum StreamItem {
    Event(ChangeEvent),
    /// The source dropped events; partial state can no longer be trusted
    Overflow,
}
