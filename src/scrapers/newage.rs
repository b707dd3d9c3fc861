//! New Age BD listing page scraper.
//!
//! Works on a saved snapshot of a section page (for example the opinion section).
//! Each story is an `article.card.card-full.hover-a` card:
//!
//! ```html
//! <article class="card card-full hover-a">
//!   <img data-src="https://.../lead.jpg">
//!   <h2 class="card-title"><a href="https://www.newagebd.net/post/...">Headline</a></h2>
//!   <p class="card-text">Teaser</p>
//!   <time>Oct 17, 2025 11:45 PM</time>
//! </article>
//! ```
//!
//! Links are kept exactly as they appear in `href`; they are the archive's dedup key.

use super::RawArticle;
use crate::utils::{collapse_whitespace, truncate_for_log};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

static CARD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article.card.card-full.hover-a").expect("card selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2.card-title a[href]").expect("link selector"));
static DESC_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p.card-text").expect("description selector"));
static TIME_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("time").expect("time selector"));
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("img selector"));

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Extract listing cards from page HTML, in page order.
///
/// Cards without a link or with an empty headline are skipped here already.
pub fn parse_listing(html: &str) -> Vec<RawArticle> {
    let document = Html::parse_document(html);
    let mut articles = Vec::new();

    for card in document.select(&CARD_SELECTOR) {
        let Some(link) = card.select(&LINK_SELECTOR).next() else {
            debug!("Card without headline link; skipping");
            continue;
        };

        let url = link.value().attr("href").unwrap_or_default().trim().to_string();
        if url.is_empty() {
            continue;
        }
        let title = element_text(link);
        if title.is_empty() {
            debug!(%url, "Card with empty headline; skipping");
            continue;
        }

        let desc = card
            .select(&DESC_SELECTOR)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let pub_text = card
            .select(&TIME_SELECTOR)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let img = card
            .select(&IMG_SELECTOR)
            .next()
            .and_then(|img| {
                let value = img.value();
                value
                    .attr("data-src")
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| value.attr("src"))
            })
            .unwrap_or_default()
            .trim()
            .to_string();

        articles.push(RawArticle {
            url,
            title,
            desc,
            pub_text,
            img,
        });
    }

    articles
}

/// Read the snapshot at `path` and scrape it.
///
/// A missing or unreadable snapshot yields no articles; the archive phase then
/// has nothing to do.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn scrape_snapshot(path: &Path) -> Vec<RawArticle> {
    let html = match tokio::fs::read_to_string(path).await {
        Ok(html) => html,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("HTML snapshot not found");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = %e, "HTML snapshot unreadable");
            return Vec::new();
        }
    };

    let articles = parse_listing(&html);
    info!(count = articles.len(), "Found articles in HTML snapshot");
    for article in articles.iter().take(3) {
        debug!(
            title = %truncate_for_log(&article.title, 60),
            url = %article.url,
            date = %article.pub_text,
            "Scraped article"
        );
    }
    articles
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
<html><body>
  <article class="card card-full hover-a">
    <img data-src="https://cdn/1.jpg" src="https://cdn/placeholder.gif">
    <h2 class="card-title"><a href="https://www.newagebd.net/post/1">  First
        headline </a></h2>
    <p class="card-text">First teaser</p>
    <time>Oct 17, 2025 11:45 PM</time>
  </article>
  <article class="card card-full hover-a">
    <h2 class="card-title"><a href="/post/2">Second <em>headline</em></a></h2>
    <img src="https://cdn/2.jpg">
  </article>
  <article class="card card-full hover-a">
    <h2 class="card-title">No link here</h2>
  </article>
  <article class="card card-full hover-a">
    <h2 class="card-title"><a href="https://www.newagebd.net/post/4">   </a></h2>
  </article>
  <article class="card">
    <h2 class="card-title"><a href="https://www.newagebd.net/post/5">Not a listing card</a></h2>
  </article>
</body></html>
"#;

    #[test]
    fn test_parse_listing_extracts_cards_in_order() {
        let articles = parse_listing(LISTING);
        assert_eq!(articles.len(), 2);

        assert_eq!(articles[0].url, "https://www.newagebd.net/post/1");
        assert_eq!(articles[0].title, "First headline");
        assert_eq!(articles[0].desc, "First teaser");
        assert_eq!(articles[0].pub_text, "Oct 17, 2025 11:45 PM");
        assert_eq!(articles[0].img, "https://cdn/1.jpg");

        assert_eq!(articles[1].url, "/post/2");
        assert_eq!(articles[1].title, "Second headline");
        assert_eq!(articles[1].desc, "");
        assert_eq!(articles[1].pub_text, "");
        assert_eq!(articles[1].img, "https://cdn/2.jpg");
    }

    #[test]
    fn test_parse_listing_empty_page() {
        assert!(parse_listing("<html><body></body></html>").is_empty());
    }

    #[tokio::test]
    async fn test_scrape_missing_snapshot_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let articles = scrape_snapshot(&dir.path().join("opinion.html")).await;
        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_snapshot_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opinion.html");
        tokio::fs::write(&path, LISTING).await.unwrap();
        assert_eq!(scrape_snapshot(&path).await.len(), 2);
    }
}
