//! Native-notification change-event source
//!
//! Default event source: the platform watcher via `notify`. The watcher
//! callback runs on its own thread, so raw events hop through an unbounded
//! channel into a forwarding task that translates them onto the engine's
//! stream contract. Watcher errors and rescan requests become
//! [`StreamItem::Overflow`].

use std::path::PathBuf;

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use dirsync_engine::{ChangeEvent, ChangeKind, StreamItem};

use crate::error::Result;

/// Streams native file-system notifications for one tree
pub struct NotifySource {
    root: PathBuf,
}

impl NotifySource {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Start watching; events flow into `tx` until the receiver closes.
    ///
    /// The watcher lives inside the returned task, so aborting the task
    /// also drops the subscription.
    pub fn spawn(self, tx: mpsc::Sender<StreamItem>) -> Result<JoinHandle<()>> {
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Result<notify::Event>>();

        let mut watcher = notify::recommended_watcher(move |res| {
            // Send failure means the session ended; drop the event
            let _ = raw_tx.send(res);
        })?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;

        Ok(tokio::spawn(async move {
            let _watcher = watcher;
            while let Some(res) = raw_rx.recv().await {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "watcher error");
                        if tx.send(StreamItem::Overflow).await.is_err() {
                            return;
                        }
                        continue;
                    }
                };

                if event.need_rescan() {
                    warn!("watcher requested rescan, treating as overflow");
                    if tx.send(StreamItem::Overflow).await.is_err() {
                        return;
                    }
                    continue;
                }

                let Some(kind) = change_kind(&event.kind) else {
                    continue;
                };
                for path in affected_paths(&event, kind) {
                    debug!(path = %path.display(), ?kind, "native event");
                    let item = StreamItem::Event(ChangeEvent::now(path, kind));
                    if tx.send(item).await.is_err() {
                        return;
                    }
                }
            }
        }))
    }
}

/// Translate a notify event kind onto the stream contract.
///
/// Removals are deliberately dropped: the engine reconciles deletions
/// through the next mirror pass, not through events. The from-side of a
/// rename is dropped for the same reason.
fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both)) => {
            Some(ChangeKind::MovedTo)
        }
        EventKind::Modify(ModifyKind::Name(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        _ => None,
    }
}

/// The paths an event speaks about, given its translated kind.
///
/// A `Both` rename carries `[from, to]`; only the destination is a path
/// that now exists.
fn affected_paths(event: &notify::Event, kind: ChangeKind) -> Vec<PathBuf> {
    if kind == ChangeKind::MovedTo && event.paths.len() > 1 {
        return event.paths.last().cloned().into_iter().collect();
    }
    event.paths.clone()
}
