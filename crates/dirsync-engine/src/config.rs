//! Sync configuration
//!
//! Persistence format and UI are external concerns; this is the validated
//! in-memory shape the engine runs from.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Allowed range for the mirror tool's thread count.
pub const THREAD_RANGE: std::ops::RangeInclusive<u32> = 1..=128;

/// Configuration for one watch-and-sync session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Watched source tree
    pub source_root: PathBuf,
    /// Mirror destination root
    pub dest_root: PathBuf,

    /// Remove destination files absent from the source
    pub mirror_deletions: bool,
    /// Hint for the external event source to poll instead of using
    /// native notifications
    pub use_polling: bool,
    /// FAT-compatible (2-second) timestamp granularity, for NAS
    /// destinations with coarse clocks
    pub fat_timestamps: bool,

    /// Mirror tool thread count, clamped to [`THREAD_RANGE`]
    pub thread_count: u32,
    /// Quiet period before a sync triggers
    pub debounce_seconds: f64,
    /// Upper bound on event accumulation before a forced sync
    pub max_latency_seconds: f64,
    /// Unconditional periodic sync interval; 0 disables it
    pub periodic_seconds: f64,

    /// Ordered glob patterns for files to exclude
    pub file_exclusions: Vec<String>,
    /// Directory names to exclude wherever they appear
    pub dir_exclusions: BTreeSet<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::new(),
            dest_root: PathBuf::new(),
            mirror_deletions: false,
            use_polling: false,
            fat_timestamps: true,
            thread_count: 16,
            debounce_seconds: 3.0,
            max_latency_seconds: 20.0,
            periodic_seconds: 0.0,
            file_exclusions: vec!["*.tmp".into(), "*.bak".into(), "~*".into()],
            dir_exclusions: BTreeSet::new(),
        }
    }
}

impl SyncConfig {
    /// Validate field ranges and pattern syntax.
    pub fn validate(&self) -> Result<()> {
        if self.source_root.as_os_str().is_empty() {
            return Err(Error::InvalidConfig {
                message: "source_root must be set".into(),
            });
        }
        if self.dest_root.as_os_str().is_empty() {
            return Err(Error::InvalidConfig {
                message: "dest_root must be set".into(),
            });
        }
        if !THREAD_RANGE.contains(&self.thread_count) {
            return Err(Error::InvalidConfig {
                message: format!(
                    "thread_count must be between {} and {}",
                    THREAD_RANGE.start(),
                    THREAD_RANGE.end()
                ),
            });
        }
        for (name, value) in [
            ("debounce_seconds", self.debounce_seconds),
            ("max_latency_seconds", self.max_latency_seconds),
            ("periodic_seconds", self.periodic_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig {
                    message: format!("{name} must be a non-negative number"),
                });
            }
        }

        // Compiling the matcher catches bad patterns early
        self.exclusion_matcher()?;
        Ok(())
    }

    /// Compile the ordered file exclusion patterns into one matcher.
    pub fn exclusion_matcher(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.file_exclusions {
            let glob = Glob::new(pattern).map_err(|source| Error::BadExclusionPattern {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| Error::BadExclusionPattern {
            pattern: self.file_exclusions.join(";"),
            source,
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs_f64(self.debounce_seconds)
    }

    pub fn max_latency(&self) -> Duration {
        Duration::from_secs_f64(self.max_latency_seconds)
    }

    /// Periodic interval, or `None` when disabled.
    pub fn periodic(&self) -> Option<Duration> {
        (self.periodic_seconds > 0.0).then(|| Duration::from_secs_f64(self.periodic_seconds))
    }
}
