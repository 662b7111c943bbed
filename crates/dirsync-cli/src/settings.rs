//! Configuration file loading
//!
//! Resolution order: explicit `--config` path (or `DIRSYNC_CONFIG`), then
//! the per-user config directory. The file is TOML; every field has a
//! default, so a minimal file only names the two roots.

use std::path::{Path, PathBuf};

use dirsync_engine::SyncConfig;
use tracing::debug;

use crate::error::{Error, Result};

const CONFIG_DIR: &str = "dirsync";
const CONFIG_FILE: &str = "config.toml";

/// The path the CLI reads when no explicit path is given.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Resolve the config path, preferring an explicit one.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    default_path().ok_or(Error::ConfigNotFound {
        path: PathBuf::from(CONFIG_FILE),
    })
}

/// Load and parse the configuration.
pub fn load(explicit: Option<&Path>) -> Result<SyncConfig> {
    let path = resolve_path(explicit)?;
    if !path.is_file() {
        return Err(Error::ConfigNotFound { path });
    }
    debug!(path = %path.display(), "loading configuration");
    let text = std::fs::read_to_string(&path)?;
    let config: SyncConfig = toml::from_str(&text)?;
    Ok(config)
}
