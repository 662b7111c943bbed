//! DirSync CLI
//!
//! Watches a source tree, corrects misnamed CR3/JPEG files, and mirrors
//! changes to a destination with a robocopy-class external tool.

mod cli;
mod commands;
mod error;
mod poll;
mod settings;
mod watch;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    }

    match cli.command {
        Commands::Run => {
            let config = settings::load(cli.config.as_deref())?;
            commands::run_watch(config)
        }
        Commands::Sync { dry_run } => {
            let config = settings::load(cli.config.as_deref())?;
            commands::run_sync(config, dry_run)
        }
        Commands::Rename { path } => {
            let root = match path {
                Some(path) => path,
                None => settings::load(cli.config.as_deref())?.source_root,
            };
            commands::run_rename(&root)
        }
        Commands::Validate => {
            commands::run_validate(cli.config.as_deref())
        }
    }
}
