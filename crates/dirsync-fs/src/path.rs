//! Extended-length path handling
//!
//! The Windows filesystem API rejects paths longer than roughly 260
//! characters unless they carry the `\\?\` extended-length prefix. Deep
//! photo archives exceed that limit routinely, so every path handed to a
//! rename/stat call or to the mirror utility goes through
//! [`to_extended_length`] first. On non-Windows hosts paths pass through
//! unchanged.

use std::path::{Path, PathBuf};

/// Convert an absolute path to the host's long-path escape form.
///
/// On Windows, canonicalizes (resolving to a drive-letter form via `dunce`
/// where possible) and prepends the `\\?\` prefix unless the path already
/// carries one. Relative paths and non-Windows hosts are returned
/// unchanged.
pub fn to_extended_length(path: &Path) -> PathBuf {
    #[cfg(windows)]
    {
        if !path.is_absolute() {
            return path.to_path_buf();
        }

        // dunce strips any verbatim prefix the resolver added, giving a
        // clean drive-letter path we can prefix exactly once.
        let resolved = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let s = resolved.to_string_lossy();
        if s.starts_with(r"\\?\") {
            return resolved;
        }
        let backslashed = s.replace('/', r"\");
        PathBuf::from(format!(r"\\?\{backslashed}"))
    }

    #[cfg(not(windows))]
    {
        path.to_path_buf()
    }
}

/// Case-insensitive extension of a path, lowercased.
pub(crate) fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
