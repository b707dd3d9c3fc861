//! The rolling daily digest.
//!
//! A digest run takes the archive records the [`WatermarkTracker`] considers new,
//! sorts them newest first and splits them into files of at most
//! `max_items_per_daily` items: `daily_feed.xml`, `daily_feed_2.xml`, and so on.
//! Readers that cap items per feed can subscribe to every file and still see each
//! new article exactly once.
//!
//! When nothing is new the primary file holds a single "No new articles" record, and
//! the watermark still moves to the current time.

use crate::archive::ArchiveStore;
use crate::config::FeedConfig;
use crate::error::PersistError;
use crate::models::Article;
use crate::outputs::rss::{ChannelInfo, write_feed};
use crate::watermark::{Watermark, WatermarkTracker};
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// What one digest run will write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestPlan {
    /// Output batches in file order; batch 0 is the primary file.
    pub batches: Vec<Vec<Article>>,
    /// True when `batches` holds only the placeholder record.
    pub placeholder: bool,
    /// The watermark to persist once every batch is written.
    pub watermark: Watermark,
}

#[derive(Debug, Clone)]
pub struct DigestBuilder {
    tracker: WatermarkTracker,
    prefix: PathBuf,
    max_per_batch: usize,
    write_empty_overflow: bool,
    title: String,
    site_link: String,
    site_name: String,
}

impl DigestBuilder {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            tracker: WatermarkTracker::new(config),
            prefix: config.paths.daily_prefix.clone(),
            max_per_batch: config.max_items_per_daily.max(1),
            write_empty_overflow: config.write_empty_overflow,
            title: config.channel.daily_title.clone(),
            site_link: config.channel.site_link.clone(),
            site_name: config.channel.site_name.clone(),
        }
    }

    pub fn tracker(&self) -> &WatermarkTracker {
        &self.tracker
    }

    /// Path of the batch at `index`: `<prefix>.xml`, then `<prefix>_2.xml`, ...
    pub fn batch_path(&self, index: usize) -> PathBuf {
        let stem = self.stem();
        let name = if index == 0 {
            format!("{stem}.xml")
        } else {
            format!("{stem}_{}.xml", index + 1)
        };
        self.prefix.with_file_name(name)
    }

    fn stem(&self) -> String {
        self.prefix
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "daily_feed".to_string())
    }

    /// The file number `N` of an overflow file name `<stem>_N.xml` (N >= 2).
    fn overflow_number(&self, name: &str) -> Option<usize> {
        let stem = self.stem();
        let digits = name
            .strip_prefix(stem.as_str())?
            .strip_prefix('_')?
            .strip_suffix(".xml")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().filter(|n| *n >= 2)
    }

    fn channel_for(&self, index: usize) -> ChannelInfo {
        let title = if index == 0 {
            self.title.clone()
        } else {
            format!("{} {}", self.title, index + 1)
        };
        ChannelInfo {
            description: format!("{title} - {}", self.site_name),
            title,
            link: self.site_link.clone(),
        }
    }

    /// Decide the batches and the next watermark without touching the disk.
    pub fn plan(
        &self,
        archive: &[Article],
        watermark: &Watermark,
        now: DateTime<Utc>,
    ) -> DigestPlan {
        let mut fresh = self.tracker.compute_new_since(archive, watermark, now);

        if fresh.is_empty() {
            return DigestPlan {
                batches: vec![vec![Article::placeholder(&self.site_link, now)]],
                placeholder: true,
                watermark: self.tracker.advance(watermark, &[], archive, now),
            };
        }

        let next = self.tracker.advance(watermark, &fresh, archive, now);
        fresh.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        DigestPlan {
            batches: partition(fresh, self.max_per_batch),
            placeholder: false,
            watermark: next,
        }
    }

    /// Write every batch of `plan`, then persist its watermark.
    ///
    /// Returns the paths written, watermark last.
    pub async fn write(
        &self,
        plan: &DigestPlan,
        now: DateTime<Utc>,
    ) -> Result<Vec<PathBuf>, PersistError> {
        let mut written = Vec::new();

        for (index, batch) in plan.batches.iter().enumerate() {
            let path = self.batch_path(index);
            write_feed(&path, &self.channel_for(index), batch).await?;
            info!(path = %path.display(), count = batch.len(), "Saved daily batch");
            written.push(path);
        }

        if self.write_empty_overflow && plan.batches.len() == 1 {
            let path = self.batch_path(1);
            write_feed(&path, &self.channel_for(1), &[]).await?;
            info!(path = %path.display(), "Saved empty overflow batch");
            written.push(path);
        }

        self.remove_stale_batches(written.len()).await;

        self.tracker.save(&plan.watermark, now).await?;
        written.push(self.tracker.path().to_path_buf());
        Ok(written)
    }

    /// Remove overflow files for batch indices at or beyond `from_index`, left
    /// behind by an earlier run that produced more batches.
    ///
    /// The whole directory is scanned, so gaps in the numbering do not hide
    /// later files. Failures are logged and otherwise ignored.
    async fn remove_stale_batches(&self, from_index: usize) {
        let dir = match self.prefix.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot scan for stale overflow batches");
                return;
            }
        };

        let keep_up_to = from_index.max(1);
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Stale overflow scan interrupted");
                    break;
                }
            };
            let name = entry.file_name();
            let Some(number) = name.to_str().and_then(|n| self.overflow_number(n)) else {
                continue;
            };
            // File `_N` holds batch index N - 1.
            if number <= keep_up_to {
                continue;
            }

            let path = entry.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => info!(path = %path.display(), "Removed stale overflow batch"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove stale overflow batch")
                }
            }
        }
    }

    /// Run the digest phase against the persisted archive.
    #[instrument(level = "info", skip_all)]
    pub async fn run(
        &self,
        archive: &ArchiveStore,
        now: DateTime<Utc>,
    ) -> Result<Vec<PathBuf>, PersistError> {
        let watermark = self.tracker.load().await;
        info!(status = %watermark.status, "Watermark state");

        let articles = archive.load_at(now).await;
        info!(
            status = %articles.status,
            count = articles.value.len(),
            "Loaded articles for digest"
        );

        let plan = self.plan(&articles.value, &watermark.value, now);
        if plan.placeholder {
            info!("No new articles; writing placeholder");
        } else {
            info!(
                batches = plan.batches.len(),
                articles = plan.batches.iter().map(Vec::len).sum::<usize>(),
                "Partitioned fresh articles"
            );
        }

        let written = self.write(&plan, now).await?;
        info!(last_seen = ?plan.watermark.last_seen, "Updated last seen");
        Ok(written)
    }
}

/// Split `articles` into consecutive batches of at most `size` items, keeping order.
///
/// # Arguments
///
/// * `articles` - Articles already sorted for output
/// * `size` - Batch capacity; zero is treated as one
///
/// # Returns
///
/// The batches in file order. An empty input yields no batches.
///
/// # Examples
///
/// ```ignore
/// let sizes: Vec<usize> = partition(seven_articles, 3).iter().map(Vec::len).collect();
/// assert_eq!(sizes, vec![3, 3, 1]);
/// ```
pub fn partition(articles: Vec<Article>, size: usize) -> Vec<Vec<Article>> {
    let size = size.max(1);
    let mut batches = Vec::with_capacity(articles.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(articles.len()));
    for article in articles {
        current.push(article);
        if current.len() == size {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
