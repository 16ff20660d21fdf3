//! Candidate password list loading.
//!
//! The list is parsed once at startup and shared read-only across all
//! workers. Order matters: candidates are tried in file order, and the first
//! match wins.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Load candidate passwords from a file, one per line.
///
/// Surrounding whitespace is trimmed from each line. Empty lines are kept as
/// empty-string candidates so that list positions match the file exactly.
pub fn load_passwords(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read password list: {}", path.display()))?;

    Ok(text.lines().map(|line| line.trim().to_string()).collect())
}
