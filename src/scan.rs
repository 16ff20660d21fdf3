//! Archive enumeration.
//!
//! Lists the files directly inside the target folder whose extension marks
//! them as an archive. The scan is intentionally non-recursive: nested
//! folders are someone else's problem.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// File extensions recognized as archives.
pub const ARCHIVE_EXTENSIONS: &[&str] = &[
    "7z", "zip", "rar", "tar", "gz", "bz2", "xz", "lzma", "iso", "dmg", "img", "vhd",
];

/// Check whether a path has a recognized archive extension (case-insensitive).
pub fn is_archive_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ARCHIVE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Enumerate archive files directly inside `dir`, sorted by path.
///
/// Non-archive files and subdirectories are ignored.
pub fn find_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut archives: Vec<PathBuf> = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry =
            entry.with_context(|| format!("Failed to list archive folder: {}", dir.display()))?;

        if entry.file_type().is_file() && is_archive_file(entry.path()) {
            archives.push(entry.into_path());
        }
    }

    archives.sort();
    Ok(archives)
}
