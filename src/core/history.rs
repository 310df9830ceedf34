// SLogViz - core/history.rs
//
// Browser history rows to log entries. The app layer runs the query and
// hands over decoded rows; this module only converts them.

use crate::core::dispatch::HistorySchema;
use crate::core::model::LogEntry;
use crate::core::timestamp::from_epoch_micros;
use crate::util::error::RecordError;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Visits joined to pages, Chromium layout. Visit times are microseconds
/// since 1601-01-01.
const CHROMIUM_QUERY: &str = "SELECT visits.id, urls.url, visits.visit_time, urls.title, \
     urls.visit_count, visits.transition \
     FROM urls, visits WHERE urls.id = visits.url";

/// Visits joined to places, Firefox layout. Visit dates are microseconds
/// since 1970-01-01.
const FIREFOX_QUERY: &str = "SELECT moz_historyvisits.id, moz_places.url, \
     moz_historyvisits.visit_date, moz_places.title, moz_places.visit_count, \
     moz_historyvisits.visit_type \
     FROM moz_places, moz_historyvisits WHERE moz_places.id = moz_historyvisits.place_id";

/// The read-only join for `schema`. Column order matches [`HistoryRow`].
pub fn visit_query(schema: HistorySchema) -> &'static str {
    match schema {
        HistorySchema::Chromium => CHROMIUM_QUERY,
        HistorySchema::Firefox => FIREFOX_QUERY,
    }
}

/// One joined visit row, in query column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRow {
    pub visit_id: i64,
    pub url: String,
    pub visit_time: i64,
    pub title: Option<String>,
    pub visit_count: Option<i64>,
    pub transition: Option<i64>,
}

/// Site label for a URL: the token after an optional scheme or `www.`
/// prefix, up to the next period. Empty when the URL has no such shape.
///
/// The last prefix occurrence wins, so a URL embedding another URL is
/// labelled by the embedded one.
pub fn domain_tag(url: &str) -> String {
    static DOMAIN: OnceLock<Regex> = OnceLock::new();
    let re = DOMAIN.get_or_init(|| {
        Regex::new(r"^.*(www\.|https?://)([^.]+)\..*").expect("domain pattern must compile")
    });
    re.captures(url)
        .map(|caps| caps[2].to_string())
        .unwrap_or_default()
}

/// Convert one visit row. Returns the reason when the row cannot be
/// represented; the caller counts it and moves on.
pub fn entry_from_row(
    row: &HistoryRow,
    schema: HistorySchema,
    origin: &str,
) -> Result<LogEntry, RecordError> {
    let sequence_id = u64::try_from(row.visit_id)
        .ok()
        .filter(|id| *id > 0)
        .ok_or(RecordError::NonPositiveId { id: row.visit_id })?;

    let timestamp = from_epoch_micros(row.visit_time, schema.epoch_offset_secs())
        .ok_or(RecordError::TimeOutOfRange {
            value: row.visit_time,
        })?;

    let raw = serde_json::to_string(row).map_err(|e| RecordError::Undecodable {
        message: e.to_string(),
    })?;

    Ok(LogEntry {
        sequence_id,
        origin: origin.to_string(),
        source: domain_tag(&row.url),
        timestamp,
        message: row.url.clone(),
        raw,
        hostname: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timestamp::format_timestamp;

    fn row(id: i64, url: &str, time: i64) -> HistoryRow {
        HistoryRow {
            visit_id: id,
            url: url.to_string(),
            visit_time: time,
            title: Some("Title".to_string()),
            visit_count: Some(3),
            transition: Some(1),
        }
    }

    #[test]
    fn test_domain_tag() {
        assert_eq!(domain_tag("https://www.rust-lang.org/learn"), "rust-lang");
        assert_eq!(domain_tag("http://example.com/"), "example");
        assert_eq!(domain_tag("www.wikipedia.org"), "wikipedia");
        assert_eq!(domain_tag("file:///home/user/notes.txt"), "");
        assert_eq!(domain_tag("about:blank"), "");
    }

    #[test]
    fn test_domain_tag_prefers_embedded_url() {
        assert_eq!(
            domain_tag("https://www.google.com/url?q=https://docs.rs/regex"),
            "docs"
        );
    }

    #[test]
    fn test_firefox_row() {
        let e = entry_from_row(
            &row(12, "https://www.mozilla.org/", 1_500_000_000_000_000),
            HistorySchema::Firefox,
            "places.sqlite",
        )
        .unwrap();
        assert_eq!(e.sequence_id, 12);
        assert_eq!(e.source, "mozilla");
        assert_eq!(e.message, "https://www.mozilla.org/");
        assert_eq!(format_timestamp(&e.timestamp), "2017-07-14T02:40:00+00:00");
        assert!(e.hostname.is_none());
        let raw: serde_json::Value = serde_json::from_str(&e.raw).unwrap();
        assert_eq!(raw["visit_count"], 3);
    }

    #[test]
    fn test_chromium_epoch() {
        let micros = (1_500_000_000 + 11_644_473_600) * 1_000_000 + 999_999;
        let e = entry_from_row(&row(1, "about:blank", micros), HistorySchema::Chromium, "History")
            .unwrap();
        assert_eq!(format_timestamp(&e.timestamp), "2017-07-14T02:40:00+00:00");
        assert_eq!(e.source, "");
    }

    #[test]
    fn test_bad_rows_rejected() {
        assert_eq!(
            entry_from_row(&row(0, "x", 0), HistorySchema::Firefox, "p").unwrap_err(),
            RecordError::NonPositiveId { id: 0 }
        );
        assert_eq!(
            entry_from_row(&row(-4, "x", 0), HistorySchema::Firefox, "p").unwrap_err(),
            RecordError::NonPositiveId { id: -4 }
        );
        assert_eq!(
            entry_from_row(&row(1, "x", i64::MAX), HistorySchema::Firefox, "p").unwrap_err(),
            RecordError::TimeOutOfRange { value: i64::MAX }
        );
    }

    #[test]
    fn test_queries_match_schema() {
        assert!(visit_query(HistorySchema::Chromium).contains("FROM urls, visits"));
        assert!(visit_query(HistorySchema::Firefox).contains("moz_historyvisits.place_id"));
    }
}
