//! The master archive of every article seen, newest-inserted first.
//!
//! The archive is an RSS document on disk. A run loads it, inserts the scraped
//! articles it has not seen before at the front, trims the tail down to capacity and
//! writes it back in full. Position is the only notion of age the archive has:
//! trimming drops the least recently inserted records, whatever their dates say.

use crate::config::FeedConfig;
use crate::dates::normalize_at;
use crate::error::PersistError;
use crate::models::{Article, Loaded};
use crate::outputs::rss::{ChannelInfo, FeedItem, parse_feed, write_feed};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Counts from one archive update, for logging and the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveUpdate {
    pub inserted: usize,
    pub skipped: usize,
    pub trimmed: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct ArchiveStore {
    path: PathBuf,
    channel: ChannelInfo,
    max_items: usize,
}

impl ArchiveStore {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            path: config.paths.archive_file.clone(),
            channel: ChannelInfo {
                title: config.channel.archive_title.clone(),
                link: config.channel.site_link.clone(),
                description: config.channel.archive_description.clone(),
            },
            max_items: config.max_items,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the archive. Missing or malformed files yield an empty archive.
    pub async fn load(&self) -> Loaded<Vec<Article>> {
        self.load_at(Utc::now()).await
    }

    /// Load the archive, using `now` for items whose date cannot be recovered.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load_at(&self, now: DateTime<Utc>) -> Loaded<Vec<Article>> {
        let xml = match tokio::fs::read_to_string(&self.path).await {
            Ok(xml) => xml,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Archive does not exist yet; starting empty");
                return Loaded::missing();
            }
            Err(e) => {
                warn!(error = %e, "Archive unreadable; starting empty");
                return Loaded::malformed(e);
            }
        };

        match parse_feed(&xml) {
            Ok(items) => {
                let articles = articles_from_items(items, now);
                info!(count = articles.len(), "Loaded archive");
                Loaded::loaded(articles)
            }
            Err(e) => {
                warn!(error = %e, "Archive could not be parsed; starting empty");
                Loaded::malformed(e)
            }
        }
    }

    /// Persist the full archive, replacing the previous file atomically.
    pub async fn save(&self, articles: &[Article]) -> Result<(), PersistError> {
        write_feed(&self.path, &self.channel, articles).await
    }

    /// Merge freshly scraped articles into the stored archive and persist it.
    ///
    /// Returns `None` without touching the file when there is nothing to merge.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), incoming = incoming.len()))]
    pub async fn update(
        &self,
        incoming: Vec<Article>,
        now: DateTime<Utc>,
    ) -> Result<Option<ArchiveUpdate>, PersistError> {
        if incoming.is_empty() {
            info!("No articles found; archive left unchanged");
            return Ok(None);
        }

        let incoming_count = incoming.len();
        let existing = self.load_at(now).await.value;
        debug!(existing = existing.len(), "Existing links in archive");

        let (merged, inserted) = merge_insert(existing, incoming);
        let before_trim = merged.len();
        let kept = trim(merged, self.max_items);

        let update = ArchiveUpdate {
            inserted,
            skipped: incoming_count - inserted,
            trimmed: before_trim - kept.len(),
            total: kept.len(),
        };
        info!(
            inserted = update.inserted,
            skipped = update.skipped,
            "Merged scraped articles"
        );
        if update.trimmed > 0 {
            info!(
                removed = update.trimmed,
                max_items = self.max_items,
                "Trimmed oldest archive entries"
            );
        }

        self.save(&kept).await?;
        info!(total = update.total, "Saved archive");
        Ok(Some(update))
    }
}

/// Normalize parsed feed items. Items without a link cannot be deduplicated and
/// are skipped.
pub fn articles_from_items(items: Vec<FeedItem>, now: DateTime<Utc>) -> Vec<Article> {
    items
        .into_iter()
        .filter_map(|item| {
            let link = item.link.unwrap_or_default().trim().to_string();
            if link.is_empty() {
                debug!("Archive item without link; skipping");
                return None;
            }
            let published_at = match item.pub_date.as_deref() {
                Some(text) if !text.trim().is_empty() => normalize_at(text, now),
                _ => now,
            };
            Some(Article {
                title: item.title.unwrap_or_default().trim().to_string(),
                link,
                description: item.description.unwrap_or_default(),
                published_at,
                image_url: item
                    .enclosure
                    .and_then(|e| e.url)
                    .filter(|url| !url.is_empty()),
            })
        })
        .collect()
}

/// Insert the articles of `incoming` whose links are not yet known at the front
/// of `existing`.
///
/// Links already in `existing`, and links repeated within `incoming`, are skipped
/// (exact, case-sensitive match); the first record seen for a link is never
/// updated. Inserted articles keep their incoming order, so the first scraped
/// article ends up first.
///
/// # Arguments
///
/// * `existing` - The stored archive, newest-inserted first
/// * `incoming` - Freshly scraped articles in page order
///
/// # Returns
///
/// The merged sequence and the number of articles inserted.
///
/// # Examples
///
/// ```ignore
/// // existing: [x, y], incoming: [a, x, b, a]
/// let (merged, inserted) = merge_insert(existing, incoming);
/// // merged: [a, b, x, y], inserted: 2
/// ```
pub fn merge_insert(existing: Vec<Article>, incoming: Vec<Article>) -> (Vec<Article>, usize) {
    let mut known: HashSet<String> = existing.iter().map(|a| a.link.clone()).collect();

    let mut merged: Vec<Article> = Vec::with_capacity(existing.len() + incoming.len());
    for article in incoming {
        if known.insert(article.link.clone()) {
            merged.push(article);
        } else {
            debug!(link = %article.link, "Skipping duplicate article");
        }
    }

    let inserted = merged.len();
    merged.extend(existing);
    (merged, inserted)
}

/// Drop records from the tail until at most `max_items` remain.
///
/// Trimming is positional: the least recently inserted records go first,
/// regardless of their publication dates.
pub fn trim(mut articles: Vec<Article>, max_items: usize) -> Vec<Article> {
    articles.truncate(max_items);
    articles
}
