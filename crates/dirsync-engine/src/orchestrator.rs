//! Pipeline orchestration
//!
//! Wires the event stream through the renamer into the trigger engine and
//! drains sync requests on a dedicated worker, so a mirror run that takes
//! minutes never blocks event intake. Exposes the start/stop/status
//! surface consumed by the GUI/CLI collaborator plus a notification
//! channel carrying rename and sync results for display.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use globset::GlobSet;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use dirsync_fs::{RenameAction, RenameOutcome, Renamer};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::event::{ChangeEvent, StreamItem};
use crate::executor::{MirrorTool, Robocopy, SyncExecutor, SyncResult};
use crate::trigger::{TriggerEngine, TriggerTimings};

/// Bounded retries for files that stay unstable or locked.
const MAX_RENAME_ATTEMPTS: u32 = 5;
/// Base delay before a deferred file is retried; doubles per attempt.
const RENAME_RETRY_BASE: Duration = Duration::from_millis(500);

/// Results surfaced to the GUI/CLI collaborator
#[derive(Debug, Clone)]
pub enum Notification {
    Rename(RenameOutcome),
    Sync(SyncResult),
}

/// Owns one running watch-and-sync session
pub struct Orchestrator {
    engine: Arc<TriggerEngine>,
    running: Arc<AtomicBool>,
    shutdown: watch::Sender<bool>,
}

impl Orchestrator {
    /// Start a session against the real robocopy tool.
    ///
    /// `events` is the stream contract with the external event source;
    /// the returned receiver carries rename and sync results.
    pub fn start(
        config: SyncConfig,
        events: mpsc::Receiver<StreamItem>,
    ) -> Result<(Self, mpsc::Receiver<Notification>)> {
        Self::start_with_tool(config, events, Arc::new(Robocopy))
    }

    /// Start with an injected mirror tool (used by tests and alternate
    /// utilities).
    pub fn start_with_tool(
        config: SyncConfig,
        mut events: mpsc::Receiver<StreamItem>,
        tool: Arc<dyn MirrorTool>,
    ) -> Result<(Self, mpsc::Receiver<Notification>)> {
        config.validate()?;
        let file_matcher = config.exclusion_matcher()?;
        let dir_exclusions = config.dir_exclusions.clone();

        let executor = Arc::new(SyncExecutor::new(&config, tool));
        executor.preflight()?;

        let (engine, mut requests) = TriggerEngine::new(TriggerTimings::from_config(&config));
        engine.start();

        let (notify_tx, notify_rx) = mpsc::channel(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let running = Arc::new(AtomicBool::new(true));

        // Sync worker: at most one mirror invocation at a time, by
        // construction. An in-flight run always completes; shutdown is
        // only observed between requests.
        {
            let engine = Arc::clone(&engine);
            let executor = Arc::clone(&executor);
            let notify = notify_tx.clone();
            let mut shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        request = requests.recv() => {
                            let Some(request) = request else { break };
                            let result = executor.run(&request).await;
                            engine.sync_completed();
                            let _ = notify.send(Notification::Sync(result)).await;
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            });
        }

        // Event intake: renames run here, but every wait is bounded; long
        // delays become requeues on the retry channel instead of sleeps
        // on the delivery path.
        {
            let engine = Arc::clone(&engine);
            let renamer = Renamer::default();
            let (retry_tx, mut retry_rx) = mpsc::channel::<(ChangeEvent, u32)>(256);
            let mut shutdown = shutdown_rx;
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        item = events.recv() => {
                            let Some(item) = item else { break };
                            match item {
                                StreamItem::Event(event) => {
                                    if is_excluded(&event.path, &file_matcher, &dir_exclusions) {
                                        debug!(path = %event.path.display(), "event excluded");
                                        continue;
                                    }
                                    engine.on_event();
                                    handle_rename(&renamer, &engine, &notify_tx, &retry_tx, event, 1)
                                        .await;
                                }
                                StreamItem::Overflow => engine.overflow_resync(),
                            }
                        }
                        retry = retry_rx.recv() => {
                            // Sender lives in this task; recv cannot fail here
                            if let Some((event, attempt)) = retry {
                                handle_rename(&renamer, &engine, &notify_tx, &retry_tx, event, attempt)
                                    .await;
                            }
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            });
        }

        Ok((
            Self {
                engine,
                running,
                shutdown: shutdown_tx,
            },
            notify_rx,
        ))
    }

    /// Manual "sync now", bypassing the timers.
    pub fn trigger_now(&self) {
        self.engine.trigger_now();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the session: no new triggers fire and no new renames start.
    ///
    /// Cancellation of an in-flight mirror run is best-effort by design;
    /// it completes on its own.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.engine.stop();
            let _ = self.shutdown.send(true);
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A path is excluded when its file name matches a file pattern or any
/// ancestor directory carries an excluded name.
fn is_excluded(path: &Path, files: &GlobSet, dirs: &BTreeSet<String>) -> bool {
    if let Some(name) = path.file_name()
        && files.is_match(Path::new(name))
    {
        return true;
    }
    path.ancestors().skip(1).any(|dir| {
        dir.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| dirs.contains(n))
    })
}

/// Run the renamer for one event and route the outcome.
///
/// Deferred and locked files go back on the retry channel with doubling
/// backoff; after the attempt budget the file is left alone with a warning
/// and syncs under its current name. A successful rename changes the tree
/// again, so it re-arms the trigger engine like any other event.
async fn handle_rename(
    renamer: &Renamer,
    engine: &Arc<TriggerEngine>,
    notify: &mpsc::Sender<Notification>,
    retry: &mpsc::Sender<(ChangeEvent, u32)>,
    event: ChangeEvent,
    attempt: u32,
) {
    if !Renamer::is_candidate(&event.path) {
        return;
    }

    let outcome = renamer.process(&event.path).await;
    match outcome.action {
        RenameAction::Deferred | RenameAction::IoError => {
            if attempt < MAX_RENAME_ATTEMPTS {
                let delay = RENAME_RETRY_BASE * 2u32.pow(attempt - 1);
                let retry = retry.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = retry.send((event, attempt + 1)).await;
                });
            } else {
                warn!(
                    path = %event.path.display(),
                    attempts = attempt,
                    "file never stabilized, syncing under its current name"
                );
                let _ = notify.send(Notification::Rename(outcome)).await;
            }
        }
        RenameAction::Renamed => {
            engine.on_event();
            let _ = notify.send(Notification::Rename(outcome)).await;
        }
        RenameAction::Conflict => {
            let _ = notify.send(Notification::Rename(outcome)).await;
        }
        RenameAction::NoAction => {}
    }
}
