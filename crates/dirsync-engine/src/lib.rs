//! Sync engine for DirSync
//!
//! Consumes a stream of change events for a watched source tree, corrects
//! misnamed image files through `dirsync-fs`, and drives one-way mirroring
//! to a destination via an external robocopy-class utility. The heart of
//! the crate is the [`trigger::TriggerEngine`], which reconciles debounce,
//! max-latency and periodic timers under an at-most-one-concurrent-sync
//! invariant.

pub mod config;
pub mod error;
pub mod event;
pub mod executor;
pub mod orchestrator;
pub mod trigger;

pub use config::SyncConfig;
pub use error::{Error, Result};
pub use event::{ChangeEvent, ChangeKind, StreamItem};
pub use executor::{MirrorOutput, MirrorSpec, MirrorTool, Robocopy, SyncExecutor, SyncOutcome, SyncResult};
pub use orchestrator::{Notification, Orchestrator};
pub use trigger::{SyncRequest, TriggerEngine, TriggerReason, TriggerTimings};
