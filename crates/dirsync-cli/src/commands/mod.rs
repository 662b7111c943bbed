//! Command implementations for the dirsync binary

pub mod rename;
pub mod run;
pub mod sync;
pub mod validate;

pub use rename::run_rename;
pub use run::run_watch;
pub use sync::run_sync;
pub use validate::run_validate;
