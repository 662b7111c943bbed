//! Scripted stand-in for the external mirror utility

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use dirsync_engine::{MirrorOutput, MirrorSpec, MirrorTool};

/// A [`MirrorTool`] double that returns scripted exit codes and records
/// every invocation.
///
/// Exit codes are consumed front-to-back; once the script is exhausted
/// every further call reports `1` (files copied). An optional per-call
/// delay simulates a long-running copy so tests can exercise the
/// in-flight coalescing path.
pub struct FakeMirror {
    exit_codes: Mutex<VecDeque<i32>>,
    delay: Duration,
    calls: Mutex<Vec<MirrorSpec>>,
}

impl FakeMirror {
    pub fn new(exit_codes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            exit_codes: Mutex::new(exit_codes.into_iter().collect()),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every invocation sleeps this long before returning.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Specs of all invocations so far, in order.
    pub fn calls(&self) -> Vec<MirrorSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MirrorTool for FakeMirror {
    async fn execute(&self, spec: &MirrorSpec) -> std::io::Result<MirrorOutput> {
        self.calls.lock().unwrap().push(spec.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let exit_code = self.exit_codes.lock().unwrap().pop_front().unwrap_or(1);
        Ok(MirrorOutput {
            exit_code,
            output: String::new(),
        })
    }
}
