//! Sync trigger engine
//!
//! Three independent timers race to turn accumulated change events into a
//! sync request:
//!
//! - **debounce** restarts on every event and fires after a quiet period,
//! - **max-latency** arms on the first unsynced event only and guarantees
//!   forward progress under continuous event pressure,
//! - **periodic** fires on a fixed schedule regardless of event activity.
//!
//! All three report into one mutex-guarded decision point. A trigger that
//! fires while a sync is already running never starts a second one; it
//! sets `pending_retrigger`, and completion of the in-flight sync re-arms
//! the debounce timer so no event burst is ever lost.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Why a sync was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    Debounce,
    MaxLatency,
    Periodic,
    Manual,
}

/// A request for one sync pass, consumed by the executor worker
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub reason: TriggerReason,
    pub requested_at: DateTime<Utc>,
}

impl SyncRequest {
    pub fn new(reason: TriggerReason) -> Self {
        Self {
            reason,
            requested_at: Utc::now(),
        }
    }
}

/// Timer intervals driving the engine
#[derive(Debug, Clone, Copy)]
pub struct TriggerTimings {
    pub debounce: Duration,
    pub max_latency: Duration,
    /// `None` disables the periodic trigger
    pub periodic: Option<Duration>,
}

impl TriggerTimings {
    pub fn from_config(config: &crate::SyncConfig) -> Self {
        Self {
            debounce: config.debounce(),
            max_latency: config.max_latency(),
            periodic: config.periodic(),
        }
    }
}

/// Mutable engine state, every access a single critical section
#[derive(Debug, Default)]
struct TriggerState {
    running: bool,
    last_event_at: Option<Instant>,
    first_unsynced_event_at: Option<Instant>,
    sync_in_flight: bool,
    pending_retrigger: bool,
    /// Invalidates debounce timers that lost a restart race
    debounce_generation: u64,
    debounce_timer: Option<JoinHandle<()>>,
    max_latency_timer: Option<JoinHandle<()>>,
    periodic_timer: Option<JoinHandle<()>>,
}

impl TriggerState {
    fn cancel_event_timers(&mut self) {
        self.debounce_generation = self.debounce_generation.wrapping_add(1);
        if let Some(t) = self.debounce_timer.take() {
            t.abort();
        }
        if let Some(t) = self.max_latency_timer.take() {
            t.abort();
        }
    }
}

/// The event-driven sync trigger engine
pub struct TriggerEngine {
    timings: TriggerTimings,
    state: Mutex<TriggerState>,
    requests: mpsc::Sender<SyncRequest>,
}

impl TriggerEngine {
    /// Create an engine and the channel its sync requests arrive on.
    ///
    /// The channel capacity of 2 is deliberate: the in-flight gate admits
    /// at most one outstanding request, the slack slot absorbs the window
    /// between send and worker pickup.
    pub fn new(timings: TriggerTimings) -> (Arc<Self>, mpsc::Receiver<SyncRequest>) {
        let (tx, rx) = mpsc::channel(2);
        let engine = Arc::new(Self {
            timings,
            state: Mutex::new(TriggerState::default()),
            requests: tx,
        });
        (engine, rx)
    }

    /// Start accepting events; spawns the periodic timer if configured.
    pub fn start(self: &Arc<Self>) {
        let mut state = self.lock();
        if state.running {
            warn!("trigger engine already running");
            return;
        }
        state.running = true;

        if let Some(interval) = self.timings.periodic {
            let engine = Arc::clone(self);
            state.periodic_timer = Some(tokio::spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    engine.fire(TriggerReason::Periodic);
                }
            }));
        }
    }

    /// Stop the engine: cancels all timers and clears the retrigger flag.
    ///
    /// A sync already handed to the executor is not killed; it runs to
    /// completion, and its completion callback finds the engine stopped.
    pub fn stop(&self) {
        let mut state = self.lock();
        if !state.running {
            return;
        }
        state.running = false;
        state.pending_retrigger = false;
        state.last_event_at = None;
        state.first_unsynced_event_at = None;
        state.cancel_event_timers();
        if let Some(t) = state.periodic_timer.take() {
            t.abort();
        }
        info!("trigger engine stopped");
    }

    /// Record one change event: restarts debounce, arms max-latency on the
    /// first unsynced event.
    pub fn on_event(self: &Arc<Self>) {
        let mut state = self.lock();
        if !state.running {
            return;
        }
        let now = Instant::now();
        state.last_event_at = Some(now);

        if state.first_unsynced_event_at.is_none() {
            state.first_unsynced_event_at = Some(now);

            let engine = Arc::clone(self);
            let delay = self.timings.max_latency;
            state.max_latency_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                engine.fire(TriggerReason::MaxLatency);
            }));
        }

        self.restart_debounce(&mut state);
    }

    /// Explicit "sync now": identical to the timers for concurrency
    /// purposes, but skips their waits entirely.
    pub fn trigger_now(&self) {
        self.fire(TriggerReason::Manual);
    }

    /// Full resync after the event source reported dropped events.
    ///
    /// Partial event state can no longer be trusted, so this behaves like
    /// a periodic fire rather than re-arming from whatever survived.
    pub fn overflow_resync(&self) {
        warn!("event stream overflow, forcing full resync");
        self.fire(TriggerReason::Periodic);
    }

    /// Notification from the executor worker that the in-flight sync is
    /// done. Re-arms immediately when events accrued during the sync.
    pub fn sync_completed(self: &Arc<Self>) {
        let mut state = self.lock();
        state.sync_in_flight = false;
        if !state.running {
            return;
        }
        if state.pending_retrigger {
            state.pending_retrigger = false;
            debug!("events accrued during sync, re-arming debounce");
            self.restart_debounce(&mut state);
        }
    }

    /// Whether a sync is currently dispatched and unfinished.
    pub fn sync_in_flight(&self) -> bool {
        self.lock().sync_in_flight
    }

    /// One synchronized decision point for every trigger.
    fn fire(&self, reason: TriggerReason) {
        let mut state = self.lock();
        if !state.running {
            return;
        }
        if state.sync_in_flight {
            debug!(?reason, "sync already in flight, coalescing");
            state.pending_retrigger = true;
            return;
        }

        state.sync_in_flight = true;
        state.first_unsynced_event_at = None;
        state.cancel_event_timers();

        info!(?reason, "sync triggered");
        let request = SyncRequest::new(reason);
        if let Err(e) = self.requests.try_send(request) {
            // Only possible if the worker vanished; drop the gate so a
            // later trigger is not wedged behind a sync that never ran.
            warn!(error = %e, "sync request channel unavailable");
            state.sync_in_flight = false;
        }
    }

    fn restart_debounce(self: &Arc<Self>, state: &mut MutexGuard<'_, TriggerState>) {
        state.debounce_generation = state.debounce_generation.wrapping_add(1);
        let generation = state.debounce_generation;
        if let Some(t) = state.debounce_timer.take() {
            t.abort();
        }

        let engine = Arc::clone(self);
        let delay = self.timings.debounce;
        state.debounce_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.fire_debounce(generation);
        }));
    }

    /// Debounce timers carry the generation they were armed with; a timer
    /// that slept through a restart is stale and must not fire.
    fn fire_debounce(&self, generation: u64) {
        {
            let state = self.lock();
            if state.debounce_generation != generation {
                return;
            }
        }
        self.fire(TriggerReason::Debounce);
    }

    fn lock(&self) -> MutexGuard<'_, TriggerState> {
        // Lock poisoning cannot happen: no panic path holds the guard.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for TriggerEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
