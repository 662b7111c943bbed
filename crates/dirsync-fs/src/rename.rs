//! Misnamed-file correction with metadata preservation
//!
//! Combines the classifier and the stability gate: once a file is
//! quiescent, its header decides the correct extension, and a mismatch is
//! fixed with a single atomic rename followed by explicit restoration of
//! timestamps and permission bits.

use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::detect::{Classification, classify, read_header};
use crate::error::{Error, Result};
use crate::path::{extension_lower, to_extended_length};
use crate::stability::StabilityGate;

/// Extensions that are candidates for content inspection.
const CANDIDATE_EXTENSIONS: [&str; 3] = ["cr3", "jpg", "jpeg"];

/// What happened to a single processed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameAction {
    /// Content and extension agree, or the content is unrecognized
    NoAction,
    /// The file was renamed to its correct extension
    Renamed,
    /// The file is still being written; retry later
    Deferred,
    /// The target name already exists; surfaced, never overwritten
    Conflict,
    /// The file was locked or otherwise inaccessible; retryable
    IoError,
}

/// Outcome of processing one file
#[derive(Debug, Clone)]
pub struct RenameOutcome {
    /// Path the file had when the event was observed
    pub original: PathBuf,
    /// Where the file ended up, when a rename happened
    pub renamed_to: Option<PathBuf>,
    pub action: RenameAction,
}

impl RenameOutcome {
    fn new(original: &Path, action: RenameAction) -> Self {
        Self {
            original: original.to_path_buf(),
            renamed_to: None,
            action,
        }
    }
}

/// Statistics from a batch pass over a directory tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub processed: u64,
    pub renamed: u64,
    pub conflicts: u64,
    pub failed: u64,
}

/// Corrects misnamed CR3/JPEG files
#[derive(Debug, Clone, Default)]
pub struct Renamer {
    gate: StabilityGate,
}

impl Renamer {
    pub fn new(gate: StabilityGate) -> Self {
        Self { gate }
    }

    /// Whether a path's extension makes it worth inspecting at all.
    pub fn is_candidate(path: &Path) -> bool {
        extension_lower(path)
            .map(|ext| CANDIDATE_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    /// Inspect one file and rename it if its content disagrees with its
    /// extension.
    ///
    /// Instability is reported as [`RenameAction::Deferred`] and a locked
    /// file as [`RenameAction::IoError`]; both are expected conditions the
    /// caller retries, not errors. An existing file at the target name is
    /// surfaced as [`RenameAction::Conflict`] and never overwritten.
    pub async fn process(&self, path: &Path) -> RenameOutcome {
        if !path.is_file() {
            // Event raced a delete or move; nothing left to correct.
            warn!(path = %path.display(), "file not found, skipping rename check");
            return RenameOutcome::new(path, RenameAction::NoAction);
        }

        if !self.gate.is_stable(path).await {
            return RenameOutcome::new(path, RenameAction::Deferred);
        }

        let header = match read_header(path) {
            Ok(h) => h,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "header read failed");
                return RenameOutcome::new(path, RenameAction::IoError);
            }
        };

        let Some(new_ext) = target_extension(classify(&header), path) else {
            return RenameOutcome::new(path, RenameAction::NoAction);
        };

        let target = path.with_extension(new_ext);
        if target.exists() {
            warn!(
                from = %path.display(),
                to = %target.display(),
                "rename target already exists"
            );
            return RenameOutcome::new(path, RenameAction::Conflict);
        }

        match rename_preserving_metadata(path, &target) {
            Ok(()) => {
                info!(from = %path.display(), to = %target.display(), "renamed");
                RenameOutcome {
                    original: path.to_path_buf(),
                    renamed_to: Some(target),
                    action: RenameAction::Renamed,
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "rename failed");
                RenameOutcome::new(path, RenameAction::IoError)
            }
        }
    }

    /// Walk a directory tree and correct every candidate file in it.
    ///
    /// Deferred files count as failed here; the batch pass has no retry
    /// queue, a follow-up run picks them up.
    pub async fn process_tree(&self, root: &Path) -> Result<BatchStats> {
        if !root.exists() {
            return Err(Error::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(Error::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        let mut stats = BatchStats::default();
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() || !Self::is_candidate(entry.path()) {
                continue;
            }

            stats.processed += 1;
            match self.process(entry.path()).await.action {
                RenameAction::Renamed => stats.renamed += 1,
                RenameAction::Conflict => stats.conflicts += 1,
                RenameAction::Deferred | RenameAction::IoError => stats.failed += 1,
                RenameAction::NoAction => {}
            }
        }

        info!(
            root = %root.display(),
            processed = stats.processed,
            renamed = stats.renamed,
            conflicts = stats.conflicts,
            failed = stats.failed,
            "batch rename pass complete"
        );
        Ok(stats)
    }
}

/// Decide the corrected extension, if any, for a classified file.
///
/// CR3 content under a `.jpg`/`.jpeg` name gets `.cr3`; JPEG content under
/// anything that is not case-insensitively `.jpg` gets `.jpg` (so `.jpeg`
/// is normalized but `.JPG` is left alone). Unknown content is passed
/// through untouched.
fn target_extension(classification: Classification, path: &Path) -> Option<&'static str> {
    let current = extension_lower(path);
    match classification {
        Classification::Cr3 => match current.as_deref() {
            Some("jpg") | Some("jpeg") => Some("cr3"),
            _ => None,
        },
        Classification::Jpeg => match current.as_deref() {
            Some("jpg") => None,
            _ => Some("jpg"),
        },
        Classification::Unknown => None,
    }
}

/// Atomically rename a file, then re-apply its timestamps and permission
/// bits.
///
/// A same-volume `rename` is a single syscall, so the file is never absent
/// from the tree, but not every rename implementation preserves all
/// attribute classes; the originals are captured beforehand and restored
/// explicitly. Both ends go through the extended-length escape so deep
/// trees stay renameable.
fn rename_preserving_metadata(from: &Path, to: &Path) -> std::io::Result<()> {
    let from_long = to_extended_length(from);
    let to_long = to_extended_length(to);

    let meta = fs::metadata(&from_long)?;
    let mtime = FileTime::from_last_modification_time(&meta);
    let atime = FileTime::from_last_access_time(&meta);

    fs::rename(&from_long, &to_long)?;

    filetime::set_file_times(&to_long, atime, mtime)?;
    fs::set_permissions(&to_long, meta.permissions())?;
    Ok(())
}
