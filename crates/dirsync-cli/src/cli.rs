//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// One-way directory mirroring with content-based image renaming
#[derive(Debug, Parser)]
#[command(name = "dirsync", version)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, env = "DIRSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Watch the source tree and mirror changes continuously
    Run,

    /// Run a single mirror pass now
    Sync {
        /// List-only preview: report what would be copied without
        /// touching the destination
        #[arg(long)]
        dry_run: bool,
    },

    /// Correct misnamed CR3/JPEG files in a directory tree
    Rename {
        /// Tree to process; defaults to the configured source root
        path: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,
}
