//! 7z binary integration for password probing and extraction.
//!
//! All archive format handling is delegated to a `7z`-compatible binary
//! invoked as a subprocess. Two operations are used:
//!
//! - Test: `7z t archive -p<password> -y`
//!   - exit 0 with no wrong-password diagnostic means the password unlocked
//!     the archive (or it was never protected)
//!   - the diagnostic stream is scanned while the tool runs so a rejected
//!     password can be reported without waiting for a full integrity scan
//!
//! - Extract: `7z x archive -p<password> -o<dir> -aoa -y`
//!   - `-aoa`: overwrite existing files
//!   - `-y`: auto-confirm any prompt
//!
//! The binary is resolved per call: the `SESAME_7Z` environment variable
//! wins, then PATH is searched for `7zz`, `7z`, and `7za`. A missing tool is
//! not fatal to a run; probes report [`ProbeOutcome::ToolError`] and
//! extraction fails for that archive only.
//!
//! Every spawned child is killed and reaped before the invoking function
//! returns, on every exit path, so no orphaned tool processes accumulate
//! under high worker counts.

use std::env;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use scopeguard::{guard, ScopeGuard};
use tracing::debug;

/// Marker the tool prints on its diagnostic stream when a password is
/// rejected. Matched case-insensitively anywhere in a line.
const WRONG_PASSWORD_MARKER: &str = "wrong password";

/// Outcome of testing one (archive, password) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The password unlocked the archive.
    Unlocked,
    /// The tool explicitly rejected the password.
    WrongPassword,
    /// The tool failed for another or unknown reason (missing binary,
    /// corrupt data, unexpected signal). Indistinguishable from a rejection
    /// for the caller's purposes.
    ToolError,
}

impl ProbeOutcome {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, ProbeOutcome::Unlocked)
    }
}

/// Locate the 7z binary.
///
/// Checks the `SESAME_7Z` environment variable first, then searches PATH for
/// `7zz`, `7z`, and `7za` in that order.
pub fn get_7z_path() -> Result<PathBuf> {
    if let Ok(override_path) = env::var("SESAME_7Z") {
        let path = PathBuf::from(override_path);
        if path.is_file() {
            return Ok(path);
        }
        bail!("SESAME_7Z points to a missing file: {}", path.display());
    }

    for name in ["7zz", "7z", "7za"] {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }

    bail!("7z binary not found. Install p7zip or point SESAME_7Z at it.")
}

/// Test whether `password` unlocks `archive`.
///
/// The empty string probes the no-password case. This call blocks for the
/// duration of the subprocess; it must run on a worker thread.
pub fn probe_archive(archive: &Path, password: &str) -> ProbeOutcome {
    match get_7z_path() {
        Ok(bin) => probe_with(&bin, archive, password),
        Err(err) => {
            debug!("Probe skipped for {}: {:#}", archive.display(), err);
            ProbeOutcome::ToolError
        }
    }
}

/// Run the test subprocess and classify its outcome.
///
/// Scans the diagnostic stream line by line while the tool runs; a
/// wrong-password line short-circuits the probe instead of waiting out a
/// possibly slow integrity scan. The child is killed and reaped on every
/// exit path.
fn probe_with(bin: &Path, archive: &Path, password: &str) -> ProbeOutcome {
    let child = Command::new(bin)
        .arg("t")
        .arg(archive)
        .arg(format!("-p{}", password))
        .arg("-y")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(err) => {
            debug!("Failed to spawn archive tool: {}", err);
            return ProbeOutcome::ToolError;
        }
    };

    let stderr = child.stderr.take();

    // Reaps the child if we bail out of the stream scan early.
    let child = guard(child, |mut child| {
        let _ = child.kill();
        let _ = child.wait();
    });

    if let Some(stderr) = stderr {
        for line in BufReader::new(stderr).lines() {
            match line {
                Ok(line) if line.to_ascii_lowercase().contains(WRONG_PASSWORD_MARKER) => {
                    return ProbeOutcome::WrongPassword;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    }

    // Stream ended without a rejection: terminate and read the exit status.
    let mut child = ScopeGuard::into_inner(child);
    let _ = child.kill();
    match child.wait() {
        Ok(status) if status.success() => ProbeOutcome::Unlocked,
        Ok(_) => ProbeOutcome::ToolError,
        Err(err) => {
            debug!("Failed to wait on archive tool: {}", err);
            ProbeOutcome::ToolError
        }
    }
}

/// Derive the extraction directory for an archive: its file name with the
/// final extension stripped, alongside the archive itself.
///
/// `backups/photos.zip` extracts into `backups/photos`.
pub fn derive_output_dir(archive: &Path) -> PathBuf {
    archive.with_extension("")
}

/// Extract `archive` into a directory derived from its name.
///
/// The output directory is created if absent. Existing files are
/// overwritten, prompts auto-confirmed. Returns the output directory on
/// success; a nonzero tool exit is an error, with no retry.
pub fn extract_archive(archive: &Path, password: &str) -> Result<PathBuf> {
    let bin = get_7z_path()?;
    let dest = derive_output_dir(archive);
    extract_with(&bin, archive, password, &dest)?;
    Ok(dest)
}

fn extract_with(bin: &Path, archive: &Path, password: &str, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create output directory: {}", dest.display()))?;

    let status = Command::new(bin)
        .arg("x")
        .arg(archive)
        .arg(format!("-p{}", password))
        .arg(format!("-o{}", dest.display()))
        .arg("-aoa")
        .arg("-y")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("Failed to run archive tool on {}", archive.display()))?;

    if !status.success() {
        bail!(
            "7z extract failed for {} (exit status {:?})",
            archive.display(),
            status.code()
        );
    }

    Ok(())
}
