//! Mirror-utility invocation
//!
//! Wraps one robocopy-class invocation per sync request: builds a
//! deterministic argument set from configuration, decodes the tool's
//! exit-code bit flags into a structured [`SyncResult`], and retries
//! transient failures with a fixed backoff. The tool itself sits behind
//! the [`MirrorTool`] capability trait so tests (or another utility) can
//! stand in without touching engine logic.

use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Command;
use tracing::{error, info, warn};

use dirsync_fs::to_extended_length;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::trigger::SyncRequest;

/// Exit-code bit: at least one file was copied.
const COPIED_BIT: i32 = 1;
/// Exit-code bit: extra files present at the destination.
const EXTRA_BIT: i32 = 2;
/// Exit-code bit: mismatched files or directories.
const MISMATCH_BIT: i32 = 4;
/// Exit codes at or above this value indicate failure.
const FATAL_THRESHOLD: i32 = 8;

/// Attempt budget for transient fatal errors.
const MAX_SYNC_ATTEMPTS: u32 = 3;
/// Fixed wait between attempts.
const SYNC_RETRY_WAIT: Duration = Duration::from_secs(5);

/// Structured interpretation of the mirror tool's exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Exit code 0: source and destination already matched
    NoChange,
    FilesCopied,
    ExtraFilesAtDest,
    Mismatches,
    /// Exit code >= 8 (or a spawn failure)
    FatalError,
}

impl SyncOutcome {
    /// Decode an exit code.
    ///
    /// The bit assignments are a compatibility contract with downstream
    /// tooling and must stay exact: 0 = no change, bits 0-2 are success
    /// variants, 8 and above is an error. A mismatch outranks extras,
    /// which outrank plain copies; the individual bits stay readable on
    /// [`SyncResult`].
    pub fn from_exit_code(code: i32) -> Self {
        if code == 0 {
            SyncOutcome::NoChange
        } else if (1..FATAL_THRESHOLD).contains(&code) {
            if code & MISMATCH_BIT != 0 {
                SyncOutcome::Mismatches
            } else if code & EXTRA_BIT != 0 {
                SyncOutcome::ExtraFilesAtDest
            } else {
                SyncOutcome::FilesCopied
            }
        } else {
            SyncOutcome::FatalError
        }
    }

    pub fn is_success(self) -> bool {
        !matches!(self, SyncOutcome::FatalError)
    }
}

/// Result of one sync invocation, terminal and immutable
#[derive(Debug, Clone)]
pub struct SyncResult {
    pub exit_code: i32,
    pub outcome: SyncOutcome,
    /// Individual exit-code bits, preserved alongside the dominant outcome
    pub copied: bool,
    pub extras: bool,
    pub mismatches: bool,
    /// Counts parsed from the tool's summary table; zero when the summary
    /// was absent or unparseable
    pub files_copied: u64,
    pub files_failed: u64,
    /// Which attempt produced this result (1-based)
    pub attempt: u32,
    pub dry_run: bool,
    pub completed_at: DateTime<Utc>,
    pub duration: Duration,
}

/// Everything one mirror invocation needs to know
#[derive(Debug, Clone)]
pub struct MirrorSpec {
    /// Source root in long-path-safe form
    pub source: PathBuf,
    /// Destination root in long-path-safe form
    pub dest: PathBuf,
    pub mirror_deletions: bool,
    pub fat_timestamps: bool,
    pub threads: u32,
    pub file_exclusions: Vec<String>,
    pub dir_exclusions: Vec<String>,
    /// List-only mode: the tool reports what it would do, mutates nothing
    pub dry_run: bool,
}

/// Raw result of running the tool once
#[derive(Debug, Clone)]
pub struct MirrorOutput {
    pub exit_code: i32,
    /// Combined stdout/stderr, used for summary parsing
    pub output: String,
}

/// Capability interface over the external directory-mirroring utility
#[async_trait]
pub trait MirrorTool: Send + Sync {
    async fn execute(&self, spec: &MirrorSpec) -> std::io::Result<MirrorOutput>;
}

/// The robocopy implementation of [`MirrorTool`]
#[derive(Debug, Default)]
pub struct Robocopy;

impl Robocopy {
    /// Build the deterministic robocopy argument set for a spec.
    ///
    /// `/E` recurses including empty directories, `/DCOPY:T` copies
    /// directory timestamps, `/COPYALL` copies every file metadata class
    /// the destination supports, `/R:2 /W:5` bounds the tool's own
    /// per-file retries, and `/NFL /NDL /NP` keep the output down to the
    /// summary table.
    pub fn build_args(spec: &MirrorSpec) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            spec.source.clone().into(),
            spec.dest.clone().into(),
            "/E".into(),
            "/DCOPY:T".into(),
            "/COPYALL".into(),
            "/R:2".into(),
            "/W:5".into(),
            format!("/MT:{}", spec.threads).into(),
            "/NFL".into(),
            "/NDL".into(),
            "/NP".into(),
        ];

        if spec.mirror_deletions {
            args.push("/MIR".into());
        }
        if spec.fat_timestamps {
            args.push("/FFT".into());
        }
        if spec.dry_run {
            args.push("/L".into());
        }
        for pattern in &spec.file_exclusions {
            args.push("/XF".into());
            args.push(pattern.into());
        }
        for name in &spec.dir_exclusions {
            args.push("/XD".into());
            args.push(name.into());
        }

        args
    }
}

#[async_trait]
impl MirrorTool for Robocopy {
    async fn execute(&self, spec: &MirrorSpec) -> std::io::Result<MirrorOutput> {
        let output = Command::new("robocopy")
            .args(Robocopy::build_args(spec))
            .stdin(Stdio::null())
            .output()
            .await?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(MirrorOutput {
            // Robocopy exit codes fit in a small integer; a signal death
            // (no code) maps to the fatal range.
            exit_code: output.status.code().unwrap_or(-1),
            output: text,
        })
    }
}

/// Runs sync requests against the mirror tool
pub struct SyncExecutor {
    spec: MirrorSpec,
    tool: Arc<dyn MirrorTool>,
}

impl SyncExecutor {
    pub fn new(config: &SyncConfig, tool: Arc<dyn MirrorTool>) -> Self {
        let spec = MirrorSpec {
            source: to_extended_length(&config.source_root),
            dest: to_extended_length(&config.dest_root),
            mirror_deletions: config.mirror_deletions,
            fat_timestamps: config.fat_timestamps,
            threads: config.thread_count,
            file_exclusions: config.file_exclusions.clone(),
            dir_exclusions: config.dir_exclusions.iter().cloned().collect(),
            dry_run: false,
        };
        Self { spec, tool }
    }

    /// Verify both roots before the first sync: the source must exist and
    /// be a directory, the destination is created if absent.
    pub fn preflight(&self) -> Result<()> {
        let source = &self.spec.source;
        if !source.is_dir() {
            return Err(Error::SourceUnavailable {
                path: source.clone(),
            });
        }

        let dest = &self.spec.dest;
        fs::create_dir_all(dest).map_err(|source| Error::DestinationUnavailable {
            path: dest.clone(),
            source,
        })?;
        Ok(())
    }

    /// Execute one sync request, retrying transient fatal results.
    ///
    /// Never fails: every path, including a tool that cannot be spawned,
    /// ends in a [`SyncResult`]. The executor reads the source tree only;
    /// all writes happen on the destination side of the tool.
    pub async fn run(&self, request: &SyncRequest) -> SyncResult {
        info!(reason = ?request.reason, source = %self.spec.source.display(),
            dest = %self.spec.dest.display(), "starting sync");

        let mut attempt = 1;
        loop {
            let result = self.attempt(false, attempt).await;

            if result.outcome == SyncOutcome::FatalError
                && is_transient(result.exit_code)
                && attempt < MAX_SYNC_ATTEMPTS
            {
                warn!(
                    exit_code = result.exit_code,
                    attempt, "transient sync failure, retrying"
                );
                tokio::time::sleep(SYNC_RETRY_WAIT).await;
                attempt += 1;
                continue;
            }

            match result.outcome {
                SyncOutcome::FatalError => error!(
                    exit_code = result.exit_code,
                    attempt = result.attempt,
                    "sync failed"
                ),
                _ => info!(
                    exit_code = result.exit_code,
                    files_copied = result.files_copied,
                    "sync completed"
                ),
            }
            return result;
        }
    }

    /// List-only preview: asks the tool what it would do without mutating
    /// the destination, and still yields a full [`SyncResult`].
    pub async fn preview(&self) -> SyncResult {
        info!(source = %self.spec.source.display(), "starting dry-run preview");
        self.attempt(true, 1).await
    }

    async fn attempt(&self, dry_run: bool, attempt: u32) -> SyncResult {
        let started = tokio::time::Instant::now();
        let spec = MirrorSpec {
            dry_run,
            ..self.spec.clone()
        };

        let (exit_code, output) = match self.tool.execute(&spec).await {
            Ok(out) => (out.exit_code, out.output),
            Err(e) => {
                error!(error = %e, "failed to invoke mirror tool");
                (-1, String::new())
            }
        };

        let (files_copied, files_failed) = parse_summary(&output);
        SyncResult {
            exit_code,
            outcome: SyncOutcome::from_exit_code(exit_code),
            copied: exit_code > 0 && exit_code < FATAL_THRESHOLD && exit_code & COPIED_BIT != 0,
            extras: exit_code > 0 && exit_code < FATAL_THRESHOLD && exit_code & EXTRA_BIT != 0,
            mismatches: exit_code > 0
                && exit_code < FATAL_THRESHOLD
                && exit_code & MISMATCH_BIT != 0,
            files_copied,
            files_failed,
            attempt,
            dry_run,
            completed_at: Utc::now(),
            duration: started.elapsed(),
        }
    }
}

/// Transient fatal codes carry bit 3 alone: some files failed to copy,
/// typically a destination that dropped off the network mid-run. Codes of
/// 16 and above (and spawn failures) are not worth retrying.
fn is_transient(exit_code: i32) -> bool {
    (FATAL_THRESHOLD..16).contains(&exit_code)
}

/// Pull copied/failed counts out of the robocopy summary table.
///
/// The `Files :` row reads `total copied skipped mismatch failed extras`;
/// anything unparseable yields zeroes rather than an error.
fn parse_summary(output: &str) -> (u64, u64) {
    for line in output.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("Files :") {
            let columns: Vec<&str> = rest.split_whitespace().collect();
            let copied = columns.get(1).and_then(|c| c.parse().ok()).unwrap_or(0);
            let failed = columns.get(4).and_then(|c| c.parse().ok()).unwrap_or(0);
            return (copied, failed);
        }
    }
    (0, 0)
}
