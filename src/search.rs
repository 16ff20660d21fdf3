//! Sequential password search over a candidate list.

use std::path::Path;

use tracing::{error, info};

use crate::sevenzip;

/// Find the password that unlocks `archive`, probing with `probe`.
///
/// The empty password is probed first so unprotected archives cost a single
/// attempt, then the candidates in list order. Probing stops at the first
/// password the tool accepts. Returns `None` once the list is exhausted.
pub fn search_with<F>(archive: &Path, passwords: &[String], mut probe: F) -> Option<String>
where
    F: FnMut(&Path, &str) -> bool,
{
    if probe(archive, "") {
        info!("No password required for {}", archive.display());
        return Some(String::new());
    }

    for password in passwords {
        if probe(archive, password) {
            info!("Password found for {}: {}", archive.display(), password);
            return Some(password.clone());
        }
    }

    error!("No password found for {}", archive.display());
    None
}

/// [`search_with`] wired to the real tool.
pub fn search(archive: &Path, passwords: &[String]) -> Option<String> {
    search_with(archive, passwords, |archive, password| {
        sevenzip::probe_archive(archive, password).is_unlocked()
    })
}
