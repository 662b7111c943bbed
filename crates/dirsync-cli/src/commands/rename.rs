//! The `rename` command: one-off batch correction of a tree

use std::path::Path;

use colored::Colorize;

use dirsync_fs::Renamer;

use crate::error::Result;

pub fn run_rename(root: &Path) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let stats = rt.block_on(async { Renamer::default().process_tree(root).await })?;

    println!(
        "{} {} file(s) examined, {} renamed",
        "ok".green(),
        stats.processed,
        stats.renamed
    );
    if stats.conflicts > 0 {
        println!(
            "{} {} file(s) left in place because the correct name was taken",
            "conflict".yellow().bold(),
            stats.conflicts
        );
    }
    if stats.failed > 0 {
        println!(
            "{} {} file(s) could not be read or renamed",
            "warning".yellow().bold(),
            stats.failed
        );
    }
    Ok(())
}
