//! Listing-page scrapers.
//!
//! A scraper turns a saved HTML snapshot into [`RawArticle`]s in page order (topmost,
//! and usually newest, first). Raw records are loose: any field may be empty. They
//! become [`Article`]s through [`to_articles`], which drops records without a link or
//! title and normalizes the date text.
//!
//! # Supported Sources
//!
//! | Source | Module | Notes |
//! |--------|--------|-------|
//! | New Age BD | [`newage`] | `article.card` listing cards |

pub mod newage;

use crate::dates::normalize_at;
use crate::models::Article;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// An article as lifted from the listing page, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawArticle {
    pub url: String,
    pub title: String,
    pub desc: String,
    /// Date text exactly as shown on the page.
    pub pub_text: String,
    pub img: String,
}

impl RawArticle {
    /// Validate and normalize; `None` when the url or title is empty.
    pub fn into_article(self, now: DateTime<Utc>) -> Option<Article> {
        let url = self.url.trim();
        let title = self.title.trim();
        if url.is_empty() || title.is_empty() {
            return None;
        }
        let img = self.img.trim();
        Some(Article {
            title: title.to_string(),
            link: url.to_string(),
            description: self.desc.trim().to_string(),
            published_at: normalize_at(&self.pub_text, now),
            image_url: (!img.is_empty()).then(|| img.to_string()),
        })
    }
}

/// Convert scraped records to articles, keeping page order and skipping
/// records that lack a url or title.
pub fn to_articles(raw: Vec<RawArticle>, now: DateTime<Utc>) -> Vec<Article> {
    let total = raw.len();
    let articles: Vec<Article> = raw
        .into_iter()
        .filter_map(|r| {
            let url = r.url.clone();
            let article = r.into_article(now);
            if article.is_none() {
                debug!(%url, "Dropping scraped record without url or title");
            }
            article
        })
        .collect();
    info!(
        scraped = total,
        kept = articles.len(),
        dropped = total - articles.len(),
        "Validated scraped records"
    );
    articles
}
