//! Error types for dirsync-engine

use std::path::PathBuf;

/// Result type for dirsync-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in dirsync-engine operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid exclusion pattern '{pattern}': {source}")]
    BadExclusionPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Source directory unavailable: {path}")]
    SourceUnavailable { path: PathBuf },

    #[error("Cannot create destination directory {path}: {source}")]
    DestinationUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem error from dirsync-fs
    #[error(transparent)]
    Fs(#[from] dirsync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
