//! Data models shared by the archive, watermark and digest stages.
//!
//! - [`Article`]: a normalized article as stored in the archive and emitted in digests
//! - [`Loaded`]: the result of a best-effort load, carrying both the value and how it
//!   was obtained so callers can log a missing or malformed file without failing

use chrono::{DateTime, Utc};
use std::fmt;

/// A normalized article record.
///
/// `link` is the identity of an article: the archive never holds two records
/// with the same link, and the first one seen is the one that is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Headline text, never empty.
    pub title: String,
    /// Absolute or site-relative URL; the deduplication key.
    pub link: String,
    /// Teaser text, possibly empty.
    pub description: String,
    /// Publication time in UTC. Falls back to ingestion time when the source
    /// date text could not be parsed.
    pub published_at: DateTime<Utc>,
    /// Lead image, emitted as an RSS enclosure.
    pub image_url: Option<String>,
}

impl Article {
    /// The synthetic record emitted when a digest run finds nothing new.
    pub fn placeholder(site_link: &str, now: DateTime<Utc>) -> Self {
        Self {
            title: "No new articles".to_string(),
            link: site_link.to_string(),
            description: "No new entries.".to_string(),
            published_at: now,
            image_url: None,
        }
    }
}

/// How a best-effort load obtained its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// The file existed and parsed.
    Loaded,
    /// The file does not exist; a default was substituted.
    Missing,
    /// The file exists but could not be read or parsed; a default was substituted.
    Malformed(String),
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Loaded => f.write_str("loaded"),
            LoadStatus::Missing => f.write_str("missing"),
            LoadStatus::Malformed(reason) => write!(f, "malformed: {reason}"),
        }
    }
}

/// A value produced by a load that never fails outward.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub value: T,
    pub status: LoadStatus,
}

impl<T: Default> Loaded<T> {
    pub fn missing() -> Self {
        Self {
            value: T::default(),
            status: LoadStatus::Missing,
        }
    }

    pub fn malformed(reason: impl fmt::Display) -> Self {
        Self {
            value: T::default(),
            status: LoadStatus::Malformed(reason.to_string()),
        }
    }
}

impl<T> Loaded<T> {
    pub fn loaded(value: T) -> Self {
        Self {
            value,
            status: LoadStatus::Loaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_placeholder_article() {
        let now = Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap();
        let article = Article::placeholder("https://www.newagebd.net", now);
        assert_eq!(article.title, "No new articles");
        assert_eq!(article.link, "https://www.newagebd.net");
        assert_eq!(article.description, "No new entries.");
        assert_eq!(article.published_at, now);
        assert!(article.image_url.is_none());
    }

    #[test]
    fn test_loaded_defaults() {
        let missing: Loaded<Vec<Article>> = Loaded::missing();
        assert!(missing.value.is_empty());
        assert_eq!(missing.status, LoadStatus::Missing);

        let malformed: Loaded<Vec<Article>> = Loaded::malformed("unexpected EOF");
        assert_eq!(
            malformed.status.to_string(),
            "malformed: unexpected EOF".to_string()
        );
    }
}
