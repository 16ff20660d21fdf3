//! Run configuration
//!
//! Defines the configuration for a recovery run. All validation failures
//! here are fatal: the run aborts before any archive is touched.

use std::path::PathBuf;

/// Configuration for a password-recovery run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Folder containing the archives to process
    pub archive_dir: PathBuf,

    /// File with candidate passwords, one per line
    pub password_file: PathBuf,

    /// Number of concurrent workers (must be positive)
    pub workers: usize,
}

impl RunConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.archive_dir.is_dir() {
            return Err(ConfigError::ArchiveDirNotFound(self.archive_dir.clone()));
        }

        if !self.password_file.is_file() {
            return Err(ConfigError::PasswordFileNotFound(self.password_file.clone()));
        }

        if self.workers == 0 {
            return Err(ConfigError::InvalidWorkerCount(self.workers));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Archive folder not found or not a directory: {0}")]
    ArchiveDirNotFound(PathBuf),

    #[error("Password list not found or not a file: {0}")]
    PasswordFileNotFound(PathBuf),

    #[error("Invalid number of workers: {0} (must be positive)")]
    InvalidWorkerCount(usize),
}
