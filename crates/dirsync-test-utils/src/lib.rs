//! Shared test utilities for the dirsync workspace.
//!
//! Provides standardised fixtures so crate test suites don't each invent
//! their own image headers and mirror-tool doubles. Dev-dependency only,
//! never published.

pub mod fixtures;
pub mod mirror;

pub use fixtures::{cr3_bytes, jpeg_bytes, ImageTree};
pub use mirror::FakeMirror;
