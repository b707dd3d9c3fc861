//! RSS 2.0 documents.
//!
//! [`format_feed`] is a pure function from channel metadata and articles to XML text;
//! [`parse_feed`] reads the `<item>` elements of an existing document back into loose
//! string fields, leaving date interpretation to the caller.

use crate::dates::format_pub_date;
use crate::error::{FeedError, PersistError};
use crate::models::Article;
use crate::utils::write_atomic;
use quick_xml::Writer;
use quick_xml::de::DeError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use tracing::{info, instrument};

/// The `<channel>` header of a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub title: String,
    pub link: String,
    pub description: String,
}

/// An `<item>` as found in a feed document, before normalization.
#[derive(Debug, Default, Deserialize)]
pub struct FeedItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub enclosure: Option<FeedEnclosure>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedEnclosure {
    #[serde(default, rename = "@url")]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(default, rename = "item")]
    items: Vec<FeedItem>,
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), FeedError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Render `items` as an RSS 2.0 document in the given order.
pub fn format_feed(channel: &ChannelInfo, items: &[Article]) -> Result<String, FeedError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss_start = BytesStart::new("rss");
    rss_start.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(rss_start))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;
    write_text_element(&mut writer, "title", &channel.title)?;
    write_text_element(&mut writer, "link", &channel.link)?;
    write_text_element(&mut writer, "description", &channel.description)?;

    for item in items {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        write_text_element(&mut writer, "title", &item.title)?;
        write_text_element(&mut writer, "link", &item.link)?;
        write_text_element(&mut writer, "description", &item.description)?;
        write_text_element(&mut writer, "pubDate", &format_pub_date(&item.published_at))?;
        if let Some(url) = item.image_url.as_deref().filter(|u| !u.is_empty()) {
            let mut enclosure = BytesStart::new("enclosure");
            enclosure.push_attribute(("url", url));
            enclosure.push_attribute(("type", "image/jpeg"));
            writer.write_event(Event::Empty(enclosure))?;
        }
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    let mut xml = String::from_utf8(writer.into_inner())?;
    xml.push('\n');
    Ok(xml)
}

/// Parse the items of an RSS document, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>, DeError> {
    let document: RssDocument = quick_xml::de::from_str(xml)?;
    Ok(document.channel.items)
}

/// Format and atomically write a feed document to `path`.
#[instrument(level = "info", skip_all, fields(path = %path.display(), items = items.len()))]
pub async fn write_feed(
    path: &Path,
    channel: &ChannelInfo,
    items: &[Article],
) -> Result<(), PersistError> {
    let xml = format_feed(channel, items).map_err(|source| PersistError::Feed {
        path: path.to_path_buf(),
        source,
    })?;
    write_atomic(path, xml.as_bytes()).await?;
    info!("Wrote feed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn channel() -> ChannelInfo {
        ChannelInfo {
            title: "Daily Feed".to_string(),
            link: "https://www.newagebd.net".to_string(),
            description: "Daily Feed - New Age BD".to_string(),
        }
    }

    fn article(link: &str, image: Option<&str>) -> Article {
        Article {
            title: format!("Title for {link}"),
            link: link.to_string(),
            description: "Tom & Jerry <b>bold</b>".to_string(),
            published_at: Utc.with_ymd_and_hms(2025, 10, 17, 8, 0, 0).unwrap(),
            image_url: image.map(str::to_string),
        }
    }

    #[test]
    fn test_format_feed_structure() {
        let xml = format_feed(
            &channel(),
            &[article("https://e/1", Some("https://e/1.jpg")), article("https://e/2", None)],
        )
        .unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<rss version=\"2.0\">"));
        assert!(xml.contains("<title>Daily Feed</title>"));
        assert!(xml.contains("<pubDate>Fri, 17 Oct 2025 08:00:00 +0000</pubDate>"));
        assert!(xml.contains("<enclosure url=\"https://e/1.jpg\" type=\"image/jpeg\"/>"));
        assert_eq!(xml.matches("<enclosure").count(), 1);
        assert!(xml.contains("Tom &amp; Jerry &lt;b&gt;bold&lt;/b&gt;"));
        assert!(xml.find("https://e/1").unwrap() < xml.find("https://e/2").unwrap());
    }

    #[test]
    fn test_format_empty_feed_is_well_formed() {
        let xml = format_feed(&channel(), &[]).unwrap();
        assert!(xml.contains("<channel>"));
        assert!(!xml.contains("<item>"));
        assert!(parse_feed(&xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_reads_back_formatted_items() {
        let xml = format_feed(
            &channel(),
            &[article("https://e/1", Some("https://e/1.jpg")), article("/rel/2", None)],
        )
        .unwrap();
        let items = parse_feed(&xml).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link.as_deref(), Some("https://e/1"));
        assert_eq!(items[0].description.as_deref(), Some("Tom & Jerry <b>bold</b>"));
        assert_eq!(
            items[0].pub_date.as_deref(),
            Some("Fri, 17 Oct 2025 08:00:00 +0000")
        );
        assert_eq!(
            items[0].enclosure.as_ref().and_then(|e| e.url.as_deref()),
            Some("https://e/1.jpg")
        );
        assert_eq!(items[1].link.as_deref(), Some("/rel/2"));
        assert!(items[1].enclosure.is_none());
    }

    #[test]
    fn test_parse_tolerates_missing_fields() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Old</title>
    <item>
      <link>https://e/only-link</link>
    </item>
  </channel>
</rss>"#;
        let items = parse_feed(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].title.is_none());
        assert!(items[0].pub_date.is_none());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_feed("<rss><channel><item>").is_err());
        assert!(parse_feed("this is not xml").is_err());
    }

    #[tokio::test]
    async fn test_write_feed_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily_feed.xml");
        write_feed(&path, &channel(), &[article("https://e/1", None)])
            .await
            .unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(parse_feed(&written).unwrap().len(), 1);
    }
}
