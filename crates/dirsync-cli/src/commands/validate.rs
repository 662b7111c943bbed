//! The `validate` command: check the configuration without running

use std::path::Path;

use colored::Colorize;

use crate::error::Result;
use crate::settings;

pub fn run_validate(explicit: Option<&Path>) -> Result<()> {
    let path = settings::resolve_path(explicit)?;
    let config = settings::load(explicit)?;
    config.validate()?;

    println!("{} {} is valid", "ok".green(), path.display());
    println!("  source:  {}", config.source_root.display());
    println!("  dest:    {}", config.dest_root.display());
    println!(
        "  mirror deletions: {}, polling: {}, threads: {}",
        config.mirror_deletions, config.use_polling, config.thread_count
    );
    Ok(())
}
