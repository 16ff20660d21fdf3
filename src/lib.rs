//! Sesame - bulk password recovery and extraction for encrypted archives.
//!
//! Scans a folder for archives, probes each one against a candidate
//! password list with an external 7z binary, and extracts whatever unlocks.
//! Archives are processed in parallel; [`runner::run`] drives a whole run.

pub mod config;
pub mod passwords;
pub mod runner;
pub mod scan;
pub mod search;
pub mod sevenzip;
