//! Sesame - bulk password recovery and extraction for encrypted archives.
//!
//! Points a password list at a folder of archives and opens everything it
//! can: each archive is probed with every candidate until one fits, then
//! extracted into a directory next to itself.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sesame::config::RunConfig;
use sesame::{passwords, runner, scan, sevenzip};

#[derive(Parser)]
#[command(name = "sesame")]
#[command(version)]
#[command(about = "Recovers archive passwords from a candidate list and extracts what unlocks")]
struct Cli {
    /// Folder to scan for archives (top level only)
    archive_dir: PathBuf,

    /// Password list, one candidate per line
    #[arg(short, long)]
    passwords: PathBuf,

    /// Worker threads (defaults to CPU thread count)
    #[arg(short, long, env = "SESAME_WORKERS")]
    workers: Option<usize>,

    /// Enable verbose logging (use RUST_LOG=sesame=debug for more detail)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(if cli.verbose {
                "sesame=debug".parse()?
            } else {
                "sesame=info".parse()?
            }),
        )
        .init();

    // Default to CPU thread count
    let thread_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let workers = cli.workers.unwrap_or(thread_count);

    let config = RunConfig {
        archive_dir: cli.archive_dir,
        password_file: cli.passwords,
        workers,
    };
    config.validate()?;

    let passwords = passwords::load_passwords(&config.password_file)?;
    let archives = scan::find_archives(&config.archive_dir)?;
    info!(
        "Found {} archives in {}",
        archives.len(),
        config.archive_dir.display()
    );

    println!("Sesame - Archive Password Recovery");
    println!("Archives:   {}", archives.len());
    println!("Passwords:  {}", passwords.len());
    println!("Workers:    {}", config.workers);
    println!();

    // A missing tool is not fatal here: every archive records a failure
    // instead. Warn once so the summary is not a surprise.
    if let Err(e) = sevenzip::get_7z_path() {
        warn!("{:#}", e);
    }

    let report = runner::run(&archives, &passwords, config.workers)?;

    println!("\n=== Extraction Summary ===");
    println!(
        "Archives:   {} processed, {} unlocked, {} extracted, {} failed",
        report.processed,
        report.unlocked,
        report.extracted,
        report.failures.len()
    );

    if !report.all_extracted() {
        println!("\nFailed archives:");
        for path in &report.failures {
            println!("  {}", path.display());
        }
        println!("\nSome archives could not be opened. Check the password list and run again.");
    } else if report.processed > 0 {
        println!("\nAll archives extracted!");
    }

    Ok(())
}
