//! The `sync` command: one mirror pass, no watching

use std::sync::Arc;

use dirsync_engine::{
    Robocopy, SyncConfig, SyncExecutor, SyncRequest, TriggerReason,
};

use crate::commands::run::print_sync;
use crate::error::{Error, Result};

pub fn run_sync(config: SyncConfig, dry_run: bool) -> Result<()> {
    config.validate()?;
    let executor = SyncExecutor::new(&config, Arc::new(Robocopy));
    executor.preflight()?;

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        if dry_run {
            executor.preview().await
        } else {
            executor.run(&SyncRequest::new(TriggerReason::Manual)).await
        }
    });

    print_sync(&result);
    if !result.outcome.is_success() {
        return Err(Error::SyncFailed {
            exit_code: result.exit_code,
        });
    }
    Ok(())
}
