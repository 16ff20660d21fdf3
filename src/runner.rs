//! Parallel archive processing.
//!
//! One worker handles one archive end to end: find the password, then
//! extract. Workers run on a dedicated rayon pool sized by the caller, with
//! a single overall progress bar and shared counters, and the run blocks
//! until every archive has been processed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{error, info};

use crate::search;
use crate::sevenzip;

/// Totals for one run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Archives handed to the pool.
    pub processed: usize,
    /// Archives a working password was found for.
    pub unlocked: usize,
    /// Archives extracted successfully.
    pub extracted: usize,
    /// Archives that failed, each listed at most once. Order follows
    /// completion, not the input list.
    pub failures: Vec<PathBuf>,
}

impl RunReport {
    pub fn all_extracted(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Shared state for one run, borrowed by every worker.
struct RunContext<'a> {
    passwords: &'a [String],
    failures: Mutex<Vec<PathBuf>>,
    unlocked: AtomicUsize,
    extracted: AtomicUsize,
    failed: AtomicUsize,
    overall_pb: ProgressBar,
}

impl RunContext<'_> {
    fn record_failure(&self, archive: &Path) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.failures
            .lock()
            .expect("failures mutex")
            .push(archive.to_path_buf());
    }

    fn update_message(&self, workers: usize) {
        self.overall_pb.set_message(format!(
            "OK:{} Fail:{} ({} threads)",
            self.extracted.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            workers
        ));
    }
}

/// Process one archive: search for its password, then extract.
///
/// An archive whose password search misses is recorded as failed without an
/// extraction attempt, so no output directory appears for it.
fn process_archive(ctx: &RunContext<'_>, archive: &Path) {
    let password = match search::search(archive, ctx.passwords) {
        Some(password) => password,
        None => {
            ctx.record_failure(archive);
            return;
        }
    };

    ctx.unlocked.fetch_add(1, Ordering::Relaxed);

    match sevenzip::extract_archive(archive, &password) {
        Ok(dest) => {
            ctx.extracted.fetch_add(1, Ordering::Relaxed);
            info!("Extracted {} to {}", archive.display(), dest.display());
        }
        Err(e) => {
            error!("FAIL: {}: {:#}", archive.display(), e);
            ctx.record_failure(archive);
        }
    }
}

/// Process `archives` on `workers` threads and report the totals.
///
/// Blocks until the last archive is done. A worker count of zero is an
/// error; per-archive failures are not, they land in the report.
pub fn run(archives: &[PathBuf], passwords: &[String], workers: usize) -> Result<RunReport> {
    if workers == 0 {
        bail!("Invalid number of workers: 0 (must be positive)");
    }

    if archives.is_empty() {
        info!("No archives to process");
        return Ok(RunReport::default());
    }

    info!(
        "Processing {} archives with {} workers...",
        archives.len(),
        workers
    );

    let overall_pb = ProgressBar::new(archives.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] Extracting [{bar:40.cyan/blue}] {pos}/{len} | {msg}")
            .unwrap()
            .progress_chars("=>-"),
    );
    overall_pb.enable_steady_tick(Duration::from_millis(100));
    overall_pb.set_message(format!("OK:0 Fail:0 ({} threads)", workers));

    let ctx = RunContext {
        passwords,
        failures: Mutex::new(Vec::new()),
        unlocked: AtomicUsize::new(0),
        extracted: AtomicUsize::new(0),
        failed: AtomicUsize::new(0),
        overall_pb,
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("Failed to build worker pool")?;

    pool.install(|| {
        archives.par_iter().for_each(|archive| {
            process_archive(&ctx, archive);
            ctx.overall_pb.inc(1);
            ctx.update_message(workers);
        });
    });

    ctx.overall_pb.finish_and_clear();

    let report = RunReport {
        processed: archives.len(),
        unlocked: ctx.unlocked.load(Ordering::Relaxed),
        extracted: ctx.extracted.load(Ordering::Relaxed),
        failures: ctx.failures.into_inner().expect("failures mutex"),
    };

    info!(
        "Run complete: {} unlocked, {} extracted, {} failed",
        report.unlocked,
        report.extracted,
        report.failures.len()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_zero_workers_is_an_error() {
        let archives = vec![PathBuf::from("a.zip")];
        let result = run(&archives, &[], 0);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_empty_archive_list() {
        let report = run(&[], &[], 4).unwrap();
        assert_eq!(report.processed, 0);
        assert!(report.all_extracted());
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use std::env;
        use std::fs;
        use std::sync::OnceLock;
        use tempfile::TempDir;

        // One shell script stands in for 7z across every test in this
        // module, keyed on the archive's file name:
        //
        //   open.zip     unlocks with no password
        //   locked.zip   unlocks with "hunter2"
        //   locked2.7z   unlocks with "hunter2"
        //   baddata.7z   unlocks with "letmein", but extraction fails
        //   anything else rejects every password
        //
        // Successful extraction drops `extracted.marker` in the output dir.
        const FAKE_TOOL: &str = r#"#!/bin/sh
mode="$1"; shift
archive="$1"; shift
pw=""
out=""
for a in "$@"; do
    case "$a" in
        -p*) pw="${a#-p}" ;;
        -o*) out="${a#-o}" ;;
    esac
done
name=$(basename "$archive")
case "$mode" in
    t)
        case "$name" in
            open.zip)
                exit 0 ;;
            locked.zip|locked2.7z)
                [ "$pw" = "hunter2" ] && exit 0
                echo "ERROR: Data Error in encrypted file. Wrong password? : d.bin" >&2
                exit 2 ;;
            baddata.7z)
                [ "$pw" = "letmein" ] && exit 0
                echo "ERROR: Wrong password" >&2
                exit 2 ;;
            *)
                echo "ERROR: Wrong password" >&2
                exit 2 ;;
        esac ;;
    x)
        case "$name" in
            baddata.7z)
                echo "ERROR: CRC Failed : d.bin" >&2
                exit 2 ;;
            *)
                mkdir -p "$out" && : > "$out/extracted.marker"
                exit 0 ;;
        esac ;;
esac
exit 1
"#;

        // SESAME_7Z is process-global, so it is set exactly once and every
        // test here routes through the same script.
        fn install_fake_tool() {
            static INSTALLED: OnceLock<PathBuf> = OnceLock::new();
            INSTALLED.get_or_init(|| {
                use std::os::unix::fs::PermissionsExt;

                let dir = TempDir::new().unwrap();
                let path = dir.path().join("fake7z.sh");
                fs::write(&path, FAKE_TOOL).unwrap();
                let mut perms = fs::metadata(&path).unwrap().permissions();
                perms.set_mode(0o755);
                fs::set_permissions(&path, perms).unwrap();

                env::set_var("SESAME_7Z", &path);

                // The script must outlive the whole test run.
                std::mem::forget(dir);
                path
            });
        }

        fn touch(dir: &Path, name: &str) -> PathBuf {
            let path = dir.join(name);
            fs::write(&path, b"not a real archive").unwrap();
            path
        }

        fn pw(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }

        #[test]
        fn test_run_mixed_archives() {
            install_fake_tool();
            let dir = TempDir::new().unwrap();

            let open = touch(dir.path(), "open.zip");
            let locked = touch(dir.path(), "locked.zip");
            let hopeless = touch(dir.path(), "hopeless.rar");
            let baddata = touch(dir.path(), "baddata.7z");

            let archives = vec![open.clone(), locked.clone(), hopeless.clone(), baddata.clone()];
            let passwords = pw(&["wrong1", "hunter2", "letmein"]);

            let report = run(&archives, &passwords, 4).unwrap();

            assert_eq!(report.processed, 4);
            assert_eq!(report.unlocked, 3);
            assert_eq!(report.extracted, 2);
            assert!(!report.all_extracted());

            // Each failed archive appears exactly once; completion order is
            // not deterministic across workers.
            let mut failures = report.failures.clone();
            failures.sort();
            let mut expected = vec![hopeless.clone(), baddata.clone()];
            expected.sort();
            assert_eq!(failures, expected);

            // Extracted archives leave a marker in their output dir.
            assert!(dir.path().join("open/extracted.marker").is_file());
            assert!(dir.path().join("locked/extracted.marker").is_file());

            // A miss never triggers extraction, so no output dir appears.
            assert!(!dir.path().join("hopeless").exists());
        }

        #[test]
        fn test_run_single_worker() {
            install_fake_tool();
            let dir = TempDir::new().unwrap();

            let open = touch(dir.path(), "open.zip");
            let locked = touch(dir.path(), "locked2.7z");

            let archives = vec![open, locked];
            let report = run(&archives, &pw(&["hunter2"]), 1).unwrap();

            assert_eq!(report.processed, 2);
            assert_eq!(report.extracted, 2);
            assert!(report.all_extracted());
            assert!(dir.path().join("locked2/extracted.marker").is_file());
        }

        #[test]
        fn test_run_exhausted_list_records_failure_once() {
            install_fake_tool();
            let dir = TempDir::new().unwrap();

            let hopeless = touch(dir.path(), "nope.rar");
            let archives = vec![hopeless.clone()];

            let report = run(&archives, &pw(&["a", "b"]), 2).unwrap();

            assert_eq!(report.unlocked, 0);
            assert_eq!(report.extracted, 0);
            assert_eq!(report.failures, vec![hopeless]);
        }
    }
}
