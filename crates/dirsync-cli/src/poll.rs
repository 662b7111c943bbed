//! Polling change-event source
//!
//! Opt-in fallback to the native watcher (`use_polling`): scans the
//! source tree on a fixed interval and diffs `(len, mtime)` snapshots.
//! Crude next to native notifications, but dependable on network shares
//! where those are not delivered.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use walkdir::WalkDir;

use dirsync_engine::{ChangeEvent, ChangeKind, StreamItem};

/// Interval between tree scans.
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

type Snapshot = HashMap<PathBuf, (u64, SystemTime)>;

/// Scans a tree periodically and emits change events
pub struct PollingSource {
    root: PathBuf,
    interval: Duration,
}

impl PollingSource {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            interval: POLL_INTERVAL,
        }
    }

    /// Start scanning; events flow into `tx` until the receiver closes.
    ///
    /// The first scan establishes a baseline without emitting anything,
    /// matching how native watchers only report changes after
    /// subscription. A failed scan is reported as [`StreamItem::Overflow`]
    /// since an unknown number of changes may have been missed.
    pub fn spawn(self, tx: mpsc::Sender<StreamItem>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut previous = match self.scan() {
                Some(snapshot) => snapshot,
                None => Snapshot::new(),
            };

            loop {
                tokio::time::sleep(self.interval).await;

                let Some(current) = self.scan() else {
                    warn!(root = %self.root.display(), "tree scan failed");
                    if tx.send(StreamItem::Overflow).await.is_err() {
                        return;
                    }
                    continue;
                };

                for (path, stamp) in &current {
                    let kind = match previous.get(path) {
                        None => Some(ChangeKind::Created),
                        Some(old) if old != stamp => Some(ChangeKind::Modified),
                        Some(_) => None,
                    };
                    if let Some(kind) = kind {
                        debug!(path = %path.display(), ?kind, "poll detected change");
                        let event = ChangeEvent::now(path.clone(), kind);
                        if tx.send(StreamItem::Event(event)).await.is_err() {
                            return;
                        }
                    }
                }

                previous = current;
            }
        })
    }

    fn scan(&self) -> Option<Snapshot> {
        if !self.root.is_dir() {
            return None;
        }

        let mut snapshot = Snapshot::new();
        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            let Ok(mtime) = meta.modified() else { continue };
            snapshot.insert(entry.into_path(), (meta.len(), mtime));
        }
        Some(snapshot)
    }
}
