//! Content-based file type detection for CR3 and JPEG files
//!
//! Extensions lie; camera offload tools in particular are known to write
//! Canon RAW data under a `.jpg` name. Detection therefore looks at magic
//! bytes only and never trusts the file name.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// Maximum number of header bytes ever read for classification.
///
/// Both signatures live well within the first 12 bytes; the rest is slack
/// so the buffer never has to grow.
pub const HEADER_LEN: usize = 64;

/// ISO base media file format `ftyp` box brand for Canon RAW 3,
/// located at byte offset 4.
const CR3_BRAND: &[u8; 8] = b"ftypcrx ";

/// JPEG start-of-image marker.
const JPEG_SOI: &[u8; 3] = &[0xFF, 0xD8, 0xFF];

/// Verdict of a header classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Canon RAW 3 container
    Cr3,
    /// JPEG image
    Jpeg,
    /// Neither signature matched, or the header was too short
    Unknown,
}

impl Classification {
    /// The canonical lowercase extension for this type, if known.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            Classification::Cr3 => Some("cr3"),
            Classification::Jpeg => Some("jpg"),
            Classification::Unknown => None,
        }
    }
}

/// Classify a file header by its magic bytes.
///
/// Deterministic signature match, no heuristics: CR3 files carry the
/// `ftypcrx ` brand at offset 4, JPEG files open with `FF D8 FF`. Empty or
/// truncated input yields [`Classification::Unknown`], never an error.
pub fn classify(header: &[u8]) -> Classification {
    if header.len() >= 12 && &header[4..12] == CR3_BRAND {
        return Classification::Cr3;
    }

    if header.len() >= 3 && &header[0..3] == JPEG_SOI.as_slice() {
        return Classification::Jpeg;
    }

    Classification::Unknown
}

/// Read at most [`HEADER_LEN`] bytes from the start of a file.
///
/// Never reads the whole file; classification stays cheap under high
/// event volume.
pub fn read_header(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut buf = [0u8; HEADER_LEN];
    let mut filled = 0;

    // A single read may return short even on a regular file; loop until
    // EOF or the buffer is full.
    loop {
        let n = file
            .read(&mut buf[filled..])
            .map_err(|e| Error::io(path, e))?;
        if n == 0 {
            break;
        }
        filled += n;
        if filled == HEADER_LEN {
            break;
        }
    }

    Ok(buf[..filled].to_vec())
}
