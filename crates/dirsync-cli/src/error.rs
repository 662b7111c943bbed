//! Error types for the CLI

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration file not found at {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Mirror tool failed with exit code {exit_code}")]
    SyncFailed { exit_code: i32 },

    #[error("Failed to watch source tree: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Engine(#[from] dirsync_engine::Error),

    #[error(transparent)]
    Fs(#[from] dirsync_fs::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
