//! # Newsfeed Archiver
//!
//! Turns a saved snapshot of a news listing page into two kinds of RSS feeds:
//! a growing, deduplicated archive of every article seen, and a rolling daily
//! digest of the articles that are new since the previous run.
//!
//! ## Usage
//!
//! ```sh
//! newsfeed_archiver --html-file opinion.html
//! ```
//!
//! ## Architecture
//!
//! One run is a short batch job:
//! 1. **Scraping**: Read the HTML snapshot and lift article cards in page order
//! 2. **Archiving**: Insert unseen articles at the front of the archive, trim the
//!    oldest entries beyond capacity, persist the archive
//! 3. **Digest**: Select the archive records newer than the watermark, write them
//!    in capped batches, advance and persist the watermark
//!
//! The archive is always persisted before the digest reads it. Every durable file is
//! replaced atomically, so an interrupted run leaves the previous state intact.

use chrono::{DateTime, Utc};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

use newsfeed_archiver::archive::ArchiveStore;
use newsfeed_archiver::cli::Cli;
use newsfeed_archiver::config::FeedConfig;
use newsfeed_archiver::digest::DigestBuilder;
use newsfeed_archiver::error::PersistError;
use newsfeed_archiver::scrapers;
use newsfeed_archiver::utils::{ensure_writable_parent, report_outputs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("newsfeed_archiver starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = FeedConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;
    info!(
        mode = ?args.mode,
        policy = ?config.window_policy,
        max_items = config.max_items,
        max_items_per_daily = config.max_items_per_daily,
        "Configuration ready"
    );

    let now = Utc::now();
    let mut outputs: Vec<PathBuf> = Vec::new();

    if args.mode.runs_archive() {
        match update_archive(&config, now).await {
            Ok(path) => outputs.extend(path),
            Err(e) => {
                error!(phase = "archive", error = %e, "Phase failed; aborting run");
                return Err(e.into());
            }
        }
    }

    if args.mode.runs_daily() {
        match update_daily(&config, now).await {
            Ok(paths) => outputs.extend(paths),
            Err(e) => {
                error!(phase = "daily", error = %e, "Phase failed; aborting run");
                return Err(e.into());
            }
        }
    }

    report_outputs(&outputs).await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Scrape the snapshot and merge it into the archive.
///
/// Returns the archive path when the archive was rewritten. A missing or empty
/// snapshot leaves the archive untouched.
#[instrument(level = "info", skip_all)]
async fn update_archive(
    config: &FeedConfig,
    now: DateTime<Utc>,
) -> Result<Option<PathBuf>, PersistError> {
    let store = ArchiveStore::new(config);
    ensure_writable_parent(store.path()).await?;

    let raw = scrapers::newage::scrape_snapshot(&config.paths.html_file).await;
    let incoming = scrapers::to_articles(raw, now);

    Ok(store
        .update(incoming, now)
        .await?
        .map(|_| store.path().to_path_buf()))
}

/// Rebuild the daily digest from the persisted archive.
#[instrument(level = "info", skip_all)]
async fn update_daily(
    config: &FeedConfig,
    now: DateTime<Utc>,
) -> Result<Vec<PathBuf>, PersistError> {
    let builder = DigestBuilder::new(config);
    ensure_writable_parent(&builder.batch_path(0)).await?;
    ensure_writable_parent(builder.tracker().path()).await?;

    builder.run(&ArchiveStore::new(config), now).await
}
