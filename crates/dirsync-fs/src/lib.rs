//! Filesystem layer for DirSync
//!
//! Provides content-based file type detection, write-stability checks and
//! metadata-preserving renames, plus extended-length path handling for
//! deep directory trees.

pub mod detect;
pub mod error;
pub mod path;
pub mod rename;
pub mod stability;

pub use detect::{Classification, classify, read_header};
pub use error::{Error, Result};
pub use path::to_extended_length;
pub use rename::{BatchStats, RenameAction, RenameOutcome, Renamer};
pub use stability::StabilityGate;
