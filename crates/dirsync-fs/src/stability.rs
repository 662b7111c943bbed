//! Write-stability detection
//!
//! A file freshly dropped by a camera offload can still be mid-write when
//! the change event arrives. Renaming it at that point would corrupt the
//! transfer, so the gate samples size and modification time twice across a
//! short fixed interval and only reports stable when both are unchanged.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::debug;

/// Interval between the two stability samples.
///
/// Implementation parameter, not a tuned invariant: long enough that an
/// active writer lands another flush in between, short enough that the
/// event-consumption path is never stalled noticeably.
pub const STABILITY_INTERVAL: Duration = Duration::from_millis(150);

/// Determines whether a file is quiescent enough to classify and rename.
#[derive(Debug, Clone)]
pub struct StabilityGate {
    interval: Duration,
}

impl Default for StabilityGate {
    fn default() -> Self {
        Self::new(STABILITY_INTERVAL)
    }
}

impl StabilityGate {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Check whether `path` looks quiescent.
    ///
    /// Takes two `(len, mtime)` samples separated by the configured
    /// interval; any difference, or any failure to stat (file vanished,
    /// locked), reports unstable. The caller is expected to requeue and
    /// retry later rather than wait here, so this is the only delay the
    /// check ever incurs.
    pub async fn is_stable(&self, path: &Path) -> bool {
        let Some(first) = sample(path) else {
            return false;
        };

        tokio::time::sleep(self.interval).await;

        match sample(path) {
            Some(second) if second == first => true,
            Some(_) => {
                debug!(path = %path.display(), "file still changing, deferring");
                false
            }
            None => false,
        }
    }
}

fn sample(path: &Path) -> Option<(u64, SystemTime)> {
    let meta = fs::metadata(path).ok()?;
    let mtime = meta.modified().ok()?;
    Some((meta.len(), mtime))
}
