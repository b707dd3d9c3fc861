//! Durable digest cursor.
//!
//! The watermark remembers the newest publication time the digest has emitted and,
//! under [`WindowPolicy::Lookback`], the links already emitted. Each digest run asks
//! the tracker which archive records are new, then advances and saves the watermark.
//!
//! On disk it is a small JSON document:
//!
//! ```json
//! {
//!   "last_seen": "2025-10-17T10:00:00+00:00",
//!   "last_run": "2025-10-18T09:00:00+00:00",
//!   "processed_links": ["https://www.newagebd.net/post/1"]
//! }
//! ```

use crate::config::{FeedConfig, WindowPolicy};
use crate::dates::parse_iso8601;
use crate::error::PersistError;
use crate::models::{Article, Loaded};
use crate::utils::write_atomic;
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Watermark {
    /// Newest `published_at` emitted so far; absent before the first run.
    pub last_seen: Option<DateTime<Utc>>,
    /// Links already emitted (lookback policy only).
    pub processed_links: BTreeSet<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WatermarkFile {
    #[serde(default)]
    last_seen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_run: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    processed_links: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WatermarkTracker {
    path: PathBuf,
    policy: WindowPolicy,
    default_window: Duration,
    lookback: Duration,
    retention: Duration,
}

impl WatermarkTracker {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            path: config.paths.watermark_file.clone(),
            policy: config.window_policy,
            default_window: Duration::try_hours(config.default_window_hours)
                .unwrap_or(Duration::MAX),
            lookback: Duration::try_hours(config.lookback_hours).unwrap_or(Duration::MAX),
            retention: Duration::try_days(config.link_retention_days).unwrap_or(Duration::MAX),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the watermark. A missing or malformed file yields a fresh watermark.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> Loaded<Watermark> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No watermark yet");
                return Loaded::missing();
            }
            Err(e) => {
                warn!(error = %e, "Watermark unreadable; starting fresh");
                return Loaded::malformed(e);
            }
        };

        let file: WatermarkFile = match serde_json::from_slice(&raw) {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, "Watermark could not be parsed; starting fresh");
                return Loaded::malformed(e);
            }
        };

        let last_seen = match file.last_seen.as_deref() {
            None => None,
            Some(text) => match parse_iso8601(text) {
                Some(dt) => Some(dt),
                None => {
                    warn!(%text, "Watermark timestamp unparseable; starting fresh");
                    return Loaded::malformed(format!("bad last_seen timestamp {text:?}"));
                }
            },
        };

        let watermark = Watermark {
            last_seen,
            processed_links: file.processed_links.into_iter().collect(),
        };
        info!(
            last_seen = ?watermark.last_seen,
            processed_links = watermark.processed_links.len(),
            "Loaded watermark"
        );
        Loaded::loaded(watermark)
    }

    /// The publication time a record must be strictly newer than, if any.
    ///
    /// Windows reaching past the representable range clamp to the earliest instant.
    pub fn cutoff(&self, watermark: &Watermark, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.policy {
            WindowPolicy::Cutoff => Some(
                watermark
                    .last_seen
                    .unwrap_or_else(|| earlier_by(now, self.default_window)),
            ),
            WindowPolicy::Lookback => watermark.last_seen.map(|t| earlier_by(t, self.lookback)),
        }
    }

    /// Records of `archive` that the digest has not emitted yet, in archive order,
    /// one per link (the first qualifying occurrence wins).
    pub fn compute_new_since(
        &self,
        archive: &[Article],
        watermark: &Watermark,
        now: DateTime<Utc>,
    ) -> Vec<Article> {
        let cutoff = self.cutoff(watermark, now);
        let after_cutoff = |a: &&Article| cutoff.is_none_or(|c| a.published_at > c);

        let fresh: Vec<Article> = match self.policy {
            WindowPolicy::Cutoff => archive
                .iter()
                .filter(after_cutoff)
                .unique_by(|a| a.link.as_str())
                .cloned()
                .collect(),
            WindowPolicy::Lookback => archive
                .iter()
                .filter(|a| !watermark.processed_links.contains(&a.link))
                .filter(after_cutoff)
                .unique_by(|a| a.link.as_str())
                .cloned()
                .collect(),
        };

        info!(
            policy = ?self.policy,
            cutoff = ?cutoff,
            count = fresh.len(),
            "Found fresh articles since cutoff"
        );
        fresh
    }

    /// The watermark after emitting `emitted`.
    ///
    /// `last_seen` moves to the newest emitted publication time, or to `now` when
    /// nothing was emitted. Under the lookback policy the emitted links are
    /// remembered, and links no longer in `archive` within the retention window of
    /// the new `last_seen` are forgotten.
    pub fn advance(
        &self,
        watermark: &Watermark,
        emitted: &[Article],
        archive: &[Article],
        now: DateTime<Utc>,
    ) -> Watermark {
        let last_seen = emitted
            .iter()
            .map(|a| a.published_at)
            .max()
            .unwrap_or(now);

        let processed_links = match self.policy {
            WindowPolicy::Cutoff => watermark.processed_links.clone(),
            WindowPolicy::Lookback => {
                let horizon = earlier_by(last_seen, self.retention);
                let retained: HashSet<&str> = archive
                    .iter()
                    .filter(|a| a.published_at >= horizon)
                    .map(|a| a.link.as_str())
                    .collect();

                let mut links = watermark.processed_links.clone();
                links.extend(emitted.iter().map(|a| a.link.clone()));
                let before = links.len();
                links.retain(|link| retained.contains(link.as_str()));
                debug!(
                    pruned = before - links.len(),
                    kept = links.len(),
                    "Pruned processed links"
                );
                links
            }
        };

        Watermark {
            last_seen: Some(last_seen),
            processed_links,
        }
    }

    /// Persist the watermark, stamping the save time as `last_run`.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn save(
        &self,
        watermark: &Watermark,
        now: DateTime<Utc>,
    ) -> Result<(), PersistError> {
        let file = WatermarkFile {
            last_seen: watermark.last_seen.map(|t| t.to_rfc3339()),
            last_run: Some(now.to_rfc3339()),
            processed_links: watermark.processed_links.iter().cloned().collect(),
        };
        let json = serde_json::to_vec_pretty(&file)?;
        write_atomic(&self.path, &json).await?;
        info!(last_seen = ?watermark.last_seen, "Saved watermark");
        Ok(())
    }
}

fn earlier_by(t: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    t.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
