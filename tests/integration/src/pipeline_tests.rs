//! End-to-end pipeline tests: event stream in, rename plus mirror out.
//!
//! Real temporary trees and real timers with short intervals; the mirror
//! tool is the scripted double from `dirsync-test-utils`.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

use dirsync_engine::{
    ChangeEvent, ChangeKind, Notification, Orchestrator, StreamItem, SyncConfig, SyncOutcome,
};
use dirsync_fs::RenameAction;
use dirsync_test_utils::{FakeMirror, ImageTree};

const WAIT: Duration = Duration::from_secs(10);

fn config(source: &std::path::Path, dest: &std::path::Path) -> SyncConfig {
    SyncConfig {
        source_root: source.to_path_buf(),
        dest_root: dest.to_path_buf(),
        // Short debounce keeps these tests fast; max latency stays out
        // of the way.
        debounce_seconds: 0.2,
        max_latency_seconds: 30.0,
        periodic_seconds: 0.0,
        ..SyncConfig::default()
    }
}

async fn next_notification(rx: &mut mpsc::Receiver<Notification>) -> Notification {
    timeout(WAIT, rx.recv())
        .await
        .expect("notification within deadline")
        .expect("notification channel open")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_misnamed_file_is_renamed_then_synced() {
    let tree = ImageTree::new();
    let dest = TempDir::new().unwrap();
    let misnamed = tree.write_cr3("2024/IMG_0001.jpg");

    let mirror = Arc::new(FakeMirror::new([1]));
    let (events_tx, events_rx) = mpsc::channel(64);
    let (orchestrator, mut notifications) =
        Orchestrator::start_with_tool(config(tree.root(), dest.path()), events_rx, mirror.clone())
            .unwrap();

    events_tx
        .send(StreamItem::Event(ChangeEvent::now(
            misnamed.clone(),
            ChangeKind::Created,
        )))
        .await
        .unwrap();

    // Stability sampling makes the rename/sync interleaving timing
    // dependent; accept either order but require both.
    let mut saw_rename = false;
    let mut saw_sync = false;
    while !(saw_rename && saw_sync) {
        match next_notification(&mut notifications).await {
            Notification::Rename(outcome) => {
                assert_eq!(outcome.action, RenameAction::Renamed);
                assert_eq!(
                    outcome.renamed_to.as_deref(),
                    Some(tree.root().join("2024/IMG_0001.cr3").as_path())
                );
                saw_rename = true;
            }
            Notification::Sync(result) => {
                assert_eq!(result.outcome, SyncOutcome::FilesCopied);
                assert!(!result.dry_run);
                saw_sync = true;
            }
        }
    }
    assert!(tree.root().join("2024/IMG_0001.cr3").is_file());
    assert!(!misnamed.exists());
    assert!(mirror.call_count() >= 1);

    orchestrator.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mirror_spec_reflects_configuration() {
    let tree = ImageTree::new();
    let dest = TempDir::new().unwrap();
    tree.write_jpeg("IMG_0002.jpg");

    let mut cfg = config(tree.root(), dest.path());
    cfg.mirror_deletions = true;
    cfg.thread_count = 4;

    let mirror = Arc::new(FakeMirror::new([0]));
    let (events_tx, events_rx) = mpsc::channel(64);
    let (orchestrator, mut notifications) =
        Orchestrator::start_with_tool(cfg, events_rx, mirror.clone()).unwrap();

    events_tx
        .send(StreamItem::Event(ChangeEvent::now(
            tree.root().join("IMG_0002.jpg"),
            ChangeKind::Modified,
        )))
        .await
        .unwrap();

    loop {
        if let Notification::Sync(result) = next_notification(&mut notifications).await {
            assert_eq!(result.outcome, SyncOutcome::NoChange);
            break;
        }
    }

    let calls = mirror.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].mirror_deletions);
    assert_eq!(calls[0].threads, 4);
    assert!(!calls[0].dry_run);

    orchestrator.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_excluded_event_does_not_sync() {
    let tree = ImageTree::new();
    let dest = TempDir::new().unwrap();
    tree.write("upload.tmp", b"partial");

    let mirror = Arc::new(FakeMirror::new([1]));
    let (events_tx, events_rx) = mpsc::channel(64);
    let (orchestrator, mut notifications) =
        Orchestrator::start_with_tool(config(tree.root(), dest.path()), events_rx, mirror.clone())
            .unwrap();

    // *.tmp is excluded by default
    events_tx
        .send(StreamItem::Event(ChangeEvent::now(
            tree.root().join("upload.tmp"),
            ChangeKind::Created,
        )))
        .await
        .unwrap();

    let quiet = timeout(Duration::from_secs(2), notifications.recv()).await;
    assert!(quiet.is_err(), "excluded event must not produce activity");
    assert_eq!(mirror.call_count(), 0);

    orchestrator.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_overflow_forces_resync() {
    let tree = ImageTree::new();
    let dest = TempDir::new().unwrap();

    let mirror = Arc::new(FakeMirror::new([1]));
    let (events_tx, events_rx) = mpsc::channel(64);
    let (orchestrator, mut notifications) =
        Orchestrator::start_with_tool(config(tree.root(), dest.path()), events_rx, mirror.clone())
            .unwrap();

    events_tx.send(StreamItem::Overflow).await.unwrap();

    match next_notification(&mut notifications).await {
        Notification::Sync(result) => assert!(result.outcome.is_success()),
        other => panic!("expected sync after overflow, got {other:?}"),
    }

    orchestrator.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_manual_trigger_bypasses_timers() {
    let tree = ImageTree::new();
    let dest = TempDir::new().unwrap();

    let mirror = Arc::new(FakeMirror::new([1]));
    let (_events_tx, events_rx) = mpsc::channel(64);
    let (orchestrator, mut notifications) =
        Orchestrator::start_with_tool(config(tree.root(), dest.path()), events_rx, mirror.clone())
            .unwrap();

    orchestrator.trigger_now();

    match next_notification(&mut notifications).await {
        Notification::Sync(result) => assert!(result.outcome.is_success()),
        other => panic!("expected sync, got {other:?}"),
    }

    orchestrator.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_burst_of_events_coalesces_into_one_sync() {
    let tree = ImageTree::new();
    let dest = TempDir::new().unwrap();

    // Debounce comfortably longer than the per-file stability wait, so
    // the burst cannot slip a premature sync through mid-processing.
    let mut cfg = config(tree.root(), dest.path());
    cfg.debounce_seconds = 0.5;

    let mirror = Arc::new(FakeMirror::new([1, 1, 1]));
    let (events_tx, events_rx) = mpsc::channel(64);
    let (orchestrator, mut notifications) =
        Orchestrator::start_with_tool(cfg, events_rx, mirror.clone()).unwrap();

    for i in 0..5 {
        let path = tree.write_jpeg(&format!("IMG_{i:04}.jpg"));
        events_tx
            .send(StreamItem::Event(ChangeEvent::now(path, ChangeKind::Created)))
            .await
            .unwrap();
    }

    // Drain until the sync arrives, then confirm silence
    loop {
        if matches!(
            next_notification(&mut notifications).await,
            Notification::Sync(_)
        ) {
            break;
        }
    }
    let quiet = timeout(Duration::from_secs(1), async {
        loop {
            match notifications.recv().await {
                Some(Notification::Sync(_)) => break,
                Some(_) => continue,
                None => std::future::pending::<()>().await,
            }
        }
    })
    .await;
    assert!(quiet.is_err(), "one burst must produce exactly one sync");
    assert_eq!(mirror.call_count(), 1);

    orchestrator.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_halts_event_processing() {
    let tree = ImageTree::new();
    let dest = TempDir::new().unwrap();

    let mirror = Arc::new(FakeMirror::new([1]));
    let (events_tx, events_rx) = mpsc::channel(64);
    let (orchestrator, mut notifications) =
        Orchestrator::start_with_tool(config(tree.root(), dest.path()), events_rx, mirror.clone())
            .unwrap();

    assert!(orchestrator.is_running());
    orchestrator.stop();
    assert!(!orchestrator.is_running());

    let path = tree.write_jpeg("late.jpg");
    let _ = events_tx
        .send(StreamItem::Event(ChangeEvent::now(path, ChangeKind::Created)))
        .await;

    let quiet = timeout(Duration::from_secs(1), notifications.recv()).await;
    assert!(
        quiet.is_err() || quiet.unwrap().is_none(),
        "no activity after stop"
    );
    assert_eq!(mirror.call_count(), 0);
}

/// Keep appending to `path` every 100ms so the stability samples always
/// disagree, for roughly `secs` of (virtual) time.
fn spawn_slow_writer(path: std::path::PathBuf, secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        use std::io::Write;
        for _ in 0..secs * 10 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let Ok(mut f) = std::fs::OpenOptions::new().append(true).open(&path) else {
                break;
            };
            f.write_all(&[0u8; 16]).expect("append to fixture");
        }
    })
}

#[tokio::test(start_paused = true)]
async fn test_unstable_file_renamed_once_it_settles() {
    let tree = ImageTree::new();
    let dest = TempDir::new().unwrap();
    let misnamed = tree.write_cr3("IMG_0100.jpg");

    let mirror = Arc::new(FakeMirror::new([1]));
    let (events_tx, events_rx) = mpsc::channel(64);
    let (orchestrator, mut notifications) =
        Orchestrator::start_with_tool(config(tree.root(), dest.path()), events_rx, mirror)
            .unwrap();

    // Still being written through the first retry or two, settles well
    // before the attempt budget runs out
    let writer = spawn_slow_writer(misnamed.clone(), 2);

    events_tx
        .send(StreamItem::Event(ChangeEvent::now(
            misnamed.clone(),
            ChangeKind::Created,
        )))
        .await
        .unwrap();

    let outcome = loop {
        match timeout(Duration::from_secs(60), notifications.recv())
            .await
            .expect("rename within deadline")
            .expect("notification channel open")
        {
            Notification::Rename(outcome) => break outcome,
            Notification::Sync(_) => continue,
        }
    };
    writer.await.unwrap();

    assert_eq!(outcome.action, RenameAction::Renamed);
    assert!(outcome.renamed_to.is_some(), "settled file must be corrected");
    assert!(tree.root().join("IMG_0100.cr3").is_file());
    assert!(!misnamed.exists());

    orchestrator.stop();
}

#[tokio::test(start_paused = true)]
async fn test_never_settling_file_keeps_its_name_after_retry_budget() {
    let tree = ImageTree::new();
    let dest = TempDir::new().unwrap();
    let misnamed = tree.write_cr3("IMG_0200.jpg");

    let mirror = Arc::new(FakeMirror::new([1]));
    let (events_tx, events_rx) = mpsc::channel(64);
    let (orchestrator, mut notifications) =
        Orchestrator::start_with_tool(config(tree.root(), dest.path()), events_rx, mirror)
            .unwrap();

    // Outlives every retry: five attempts with doubling backoff span
    // well under twenty seconds
    let writer = spawn_slow_writer(misnamed.clone(), 20);

    events_tx
        .send(StreamItem::Event(ChangeEvent::now(
            misnamed.clone(),
            ChangeKind::Created,
        )))
        .await
        .unwrap();

    let outcome = loop {
        match timeout(Duration::from_secs(60), notifications.recv())
            .await
            .expect("exhaustion surfaced within deadline")
            .expect("notification channel open")
        {
            Notification::Rename(outcome) => break outcome,
            Notification::Sync(_) => continue,
        }
    };
    writer.abort();

    // Budget spent: the file is surfaced as still deferred and syncs
    // under the name it has
    assert_eq!(outcome.action, RenameAction::Deferred);
    assert!(outcome.renamed_to.is_none());
    assert!(misnamed.is_file());
    assert!(!tree.root().join("IMG_0200.cr3").exists());

    orchestrator.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_source_refuses_to_start() {
    let dest = TempDir::new().unwrap();
    let gone = dest.path().join("never-existed");

    let (_events_tx, events_rx) = mpsc::channel(64);
    let result = Orchestrator::start_with_tool(
        config(&gone, &dest.path().join("out")),
        events_rx,
        Arc::new(FakeMirror::new([1])),
    );
    assert!(result.is_err());
}
