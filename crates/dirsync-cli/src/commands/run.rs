//! The `run` command: watch, rename, mirror until interrupted

use colored::Colorize;
use tokio::sync::mpsc;

use dirsync_engine::{Notification, Orchestrator, SyncConfig, SyncOutcome, SyncResult};
use dirsync_fs::{RenameAction, RenameOutcome};

use crate::error::Result;
use crate::poll::PollingSource;
use crate::watch::NotifySource;

/// Event channel capacity; a full channel backpressures the event source
/// rather than dropping events.
const EVENT_CAPACITY: usize = 1024;

pub fn run_watch(config: SyncConfig) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(watch(config))
}

async fn watch(config: SyncConfig) -> Result<()> {
    let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);

    // Native notifications by default; polling is the opt-in fallback for
    // network shares that don't deliver them.
    let events_task = if config.use_polling {
        tracing::info!("polling event source selected");
        PollingSource::new(config.source_root.clone()).spawn(events_tx)
    } else {
        NotifySource::new(config.source_root.clone()).spawn(events_tx)?
    };

    let source = config.source_root.clone();
    let dest = config.dest_root.clone();
    let (orchestrator, mut notifications) = match Orchestrator::start(config, events_rx) {
        Ok(started) => started,
        Err(e) => {
            events_task.abort();
            return Err(e.into());
        }
    };

    println!(
        "{} watching {} -> {}",
        "dirsync".green().bold(),
        source.display(),
        dest.display()
    );
    println!("Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            note = notifications.recv() => match note {
                Some(note) => print_notification(&note),
                None => break,
            },
        }
    }

    println!("{} stopping", "dirsync".green().bold());
    orchestrator.stop();
    events_task.abort();
    Ok(())
}

fn print_notification(note: &Notification) {
    match note {
        Notification::Rename(outcome) => print_rename(outcome),
        Notification::Sync(result) => print_sync(result),
    }
}

fn print_rename(outcome: &RenameOutcome) {
    match outcome.action {
        RenameAction::Renamed => {
            let target = outcome
                .renamed_to
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            println!(
                "{} {} -> {}",
                "renamed".green(),
                outcome.original.display(),
                target
            );
        }
        RenameAction::Conflict => {
            println!(
                "{} {} (correct name already taken, file left in place)",
                "conflict".yellow().bold(),
                outcome.original.display()
            );
        }
        RenameAction::Deferred | RenameAction::IoError => {
            println!(
                "{} {} (never stabilized, kept its current name)",
                "skipped".yellow(),
                outcome.original.display()
            );
        }
        RenameAction::NoAction => {}
    }
}

pub(crate) fn print_sync(result: &SyncResult) {
    let label = if result.dry_run { "preview" } else { "sync" };
    match result.outcome {
        SyncOutcome::FatalError => {
            println!(
                "{} {} failed with exit code {} after {} attempt(s)",
                "error".red().bold(),
                label,
                result.exit_code,
                result.attempt
            );
        }
        SyncOutcome::NoChange => {
            println!("{} {}: nothing to do", "ok".green(), label);
        }
        _ => {
            println!(
                "{} {}: {} file(s) copied, {} failed ({:.1}s)",
                "ok".green(),
                label,
                result.files_copied,
                result.files_failed,
                result.duration.as_secs_f64()
            );
        }
    }
}
