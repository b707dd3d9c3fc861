//! Best-effort conversion of free-form date text into UTC timestamps.
//!
//! Listing pages and older feed files carry dates in a handful of shapes. The
//! normalizer never fails: text it cannot understand becomes "now", which keeps
//! freshly scraped articles inside the next digest window instead of dropping them.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

/// RFC 2822 shapes that carry no zone, with or without weekday and seconds.
/// Results are taken as UTC.
const ZONELESS_RFC2822_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S",
    "%a, %d %b %Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
];

/// Formats tried after RFC 2822, in priority order. Results are taken as UTC.
const FALLBACK_FORMATS: &[&str] = &[
    "%b %d, %Y %I:%M %p",
    "%d %b %Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Normalize `text`, using `now` for empty or unparseable input.
///
/// Tried in order: RFC 2822 with a zone, RFC 2822 without one, then the
/// listing-page and ISO-like fallbacks. Zone-less results are taken as UTC.
///
/// # Examples
///
/// ```ignore
/// let dt = normalize_at("Fri, 17 Oct 2025 08:00:00", now);
/// assert_eq!(dt.to_rfc3339(), "2025-10-17T08:00:00+00:00");
/// assert_eq!(normalize_at("2 hours ago", now), now);
/// ```
pub fn normalize_at(text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    let text = text.trim();
    if text.is_empty() {
        return now;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return dt.with_timezone(&Utc);
    }

    for format in ZONELESS_RFC2822_FORMATS.iter().chain(FALLBACK_FORMATS) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return naive.and_utc();
        }
    }

    debug!(%text, "Unrecognized date text; using current time");
    now
}

/// Parse a persisted ISO-8601 timestamp. Offset-less values are taken as UTC.
pub fn parse_iso8601(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Render a timestamp the way RSS `pubDate` elements are written.
pub fn format_pub_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 18, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_text_is_now() {
        assert_eq!(normalize_at("", now()), now());
        assert_eq!(normalize_at("   ", now()), now());
    }

    #[test]
    fn test_rfc2822_converts_to_utc() {
        let dt = normalize_at("Sat, 18 Oct 2025 16:30:00 +0600", now());
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 10, 18, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_rfc2822_gmt_zone() {
        let dt = normalize_at("Mon, 21 Oct 2024 07:28:00 GMT", now());
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 10, 21, 7, 28, 0).unwrap());
    }

    #[test]
    fn test_zoneless_rfc2822_is_utc() {
        let expected = Utc.with_ymd_and_hms(2025, 10, 17, 8, 0, 0).unwrap();
        assert_eq!(normalize_at("Fri, 17 Oct 2025 08:00:00", now()), expected);
        assert_eq!(normalize_at("Fri, 17 Oct 2025 08:00", now()), expected);
        assert_eq!(normalize_at("17 Oct 2025 08:00:00", now()), expected);
        assert_eq!(normalize_at("17 Oct 2025 08:00", now()), expected);
    }

    #[test]
    fn test_listing_page_format() {
        let dt = normalize_at("Oct 17, 2025 11:45 PM", now());
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 10, 17, 23, 45, 0).unwrap());
    }

    #[test]
    fn test_day_month_year_format() {
        let dt = normalize_at("17 Oct 2025 08:05:09", now());
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 10, 17, 8, 5, 9).unwrap());
    }

    #[test]
    fn test_iso_like_format() {
        let dt = normalize_at("2025-10-17 08:05:09", now());
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 10, 17, 8, 5, 9).unwrap());
    }

    #[test]
    fn test_garbage_is_now() {
        assert_eq!(normalize_at("2 hours ago", now()), now());
        assert_eq!(normalize_at("not a date", now()), now());
    }

    #[test]
    fn test_pub_date_round_trips_through_normalizer() {
        let dt = Utc.with_ymd_and_hms(2025, 3, 1, 6, 7, 8).unwrap();
        let text = format_pub_date(&dt);
        assert_eq!(text, "Sat, 01 Mar 2025 06:07:08 +0000");
        assert_eq!(normalize_at(&text, now()), dt);
    }

    #[test]
    fn test_parse_iso8601_variants() {
        let expected = Utc.with_ymd_and_hms(2025, 10, 17, 10, 0, 0).unwrap();
        assert_eq!(parse_iso8601("2025-10-17T10:00:00+00:00"), Some(expected));
        assert_eq!(parse_iso8601("2025-10-17T16:00:00+06:00"), Some(expected));
        assert_eq!(parse_iso8601("2025-10-17T10:00:00"), Some(expected));
        assert_eq!(parse_iso8601("2025-10-17T10:00:00.000000"), Some(expected));
        assert_eq!(parse_iso8601("yesterday"), None);
    }
}
