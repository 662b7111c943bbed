//! Image-file tree fixtures

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A minimal valid CR3 header: ISO-BMFF `ftyp` box with the `crx ` brand,
/// padded out so it reads like a plausible file prefix.
pub fn cr3_bytes() -> Vec<u8> {
    let mut b = vec![0x00, 0x00, 0x00, 0x18];
    b.extend_from_slice(b"ftypcrx ");
    b.extend_from_slice(&[0u8; 120]);
    b
}

/// A minimal JPEG: SOI marker followed by an APP0 stub.
pub fn jpeg_bytes() -> Vec<u8> {
    let mut b = vec![0xFF, 0xD8, 0xFF, 0xE0];
    b.extend_from_slice(&[0u8; 120]);
    b
}

/// Temporary source tree populated with image files
pub struct ImageTree {
    dir: TempDir,
}

impl ImageTree {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp tree"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file with arbitrary bytes, creating parent directories.
    pub fn write(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parents");
        }
        std::fs::write(&path, bytes).expect("write fixture file");
        path
    }

    /// A CR3 file stored under the given (possibly wrong) name.
    pub fn write_cr3(&self, relative: &str) -> PathBuf {
        self.write(relative, &cr3_bytes())
    }

    /// A JPEG file stored under the given (possibly wrong) name.
    pub fn write_jpeg(&self, relative: &str) -> PathBuf {
        self.write(relative, &jpeg_bytes())
    }
}

impl Default for ImageTree {
    fn default() -> Self {
        Self::new()
    }
}
