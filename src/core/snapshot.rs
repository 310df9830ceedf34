// SLogViz - core/snapshot.rs
//
// JSON snapshot of a collection: the persistence format used to save an
// import and load it again later without re-parsing the original source.
// Core layer: writes to any `Write`, reads from an in-memory string.
//
// Layout (tagged envelopes, pretty-printed):
//
//   { "logfile": { "name", "lines", "type", "sources",
//                  "content": [ { "logfile_entry": { "id", "origin_name",
//                      "message", "structured_data", "hostname", "source",
//                      "timestamp": { "datetime": "<ISO-8601>" } } } ] } }
//
// A sparse snapshot omits `structured_data`; re-imported entries then carry
// an empty `raw`.

use crate::core::model::{FormatKind, LogCollection, LogEntry};
use crate::core::timestamp::{format_timestamp, parse_iso_timestamp};
use crate::util::error::{ExportError, ImportError};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

// =============================================================================
// Wire shapes
// =============================================================================

#[derive(Serialize)]
struct SnapshotOut<'a> {
    logfile: CollectionOut<'a>,
}

#[derive(Serialize)]
struct CollectionOut<'a> {
    name: &'a str,
    lines: usize,
    #[serde(rename = "type")]
    kind: FormatKind,
    content: Vec<EntryEnvelopeOut<'a>>,
    sources: &'a [String],
}

#[derive(Serialize)]
struct EntryEnvelopeOut<'a> {
    logfile_entry: EntryOut<'a>,
}

#[derive(Serialize)]
struct EntryOut<'a> {
    id: u64,
    origin_name: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    structured_data: Option<&'a str>,
    timestamp: TimestampField,
    hostname: Option<&'a str>,
    source: &'a str,
}

#[derive(Serialize, Deserialize)]
struct TimestampField {
    datetime: String,
}

#[derive(Deserialize)]
struct SnapshotIn {
    logfile: CollectionIn,
}

#[derive(Deserialize)]
struct CollectionIn {
    name: String,
    #[serde(rename = "type")]
    kind: FormatKind,
    content: Vec<EntryEnvelopeIn>,
    #[serde(default)]
    sources: Vec<String>,
}

#[derive(Deserialize)]
struct EntryEnvelopeIn {
    logfile_entry: EntryIn,
}

#[derive(Deserialize)]
struct EntryIn {
    id: u64,
    #[serde(default)]
    origin_name: Option<String>,
    message: String,
    #[serde(default)]
    structured_data: Option<String>,
    timestamp: TimestampField,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    source: String,
}

// =============================================================================
// Export
// =============================================================================

/// Serialise `collection` as a snapshot into `writer`.
///
/// Returns the number of entries written. `export_path` is only used for
/// error context.
pub fn write_snapshot<W: Write>(
    collection: &LogCollection,
    writer: W,
    sparse: bool,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let content = collection
        .entries
        .iter()
        .map(|e| EntryEnvelopeOut {
            logfile_entry: EntryOut {
                id: e.sequence_id,
                origin_name: &e.origin,
                message: &e.message,
                structured_data: (!sparse).then_some(e.raw.as_str()),
                timestamp: TimestampField {
                    datetime: format_timestamp(&e.timestamp),
                },
                hostname: e.hostname.as_deref(),
                source: &e.source,
            },
        })
        .collect();

    let snapshot = SnapshotOut {
        logfile: CollectionOut {
            name: &collection.name,
            lines: collection.len(),
            kind: collection.format_kind,
            content,
            sources: &collection.sources,
        },
    };

    serde_json::to_writer_pretty(writer, &snapshot).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(collection.len())
}

// =============================================================================
// Import
// =============================================================================

/// Rebuild a collection from snapshot text read from `path`.
///
/// The collection keeps the name and format tag stored in the snapshot.
/// Entries without a stored origin are attributed to `path`. Any entry whose
/// timestamp cannot be parsed fails the whole import.
pub fn parse_snapshot(content: &str, path: &Path) -> Result<LogCollection, ImportError> {
    let snapshot: SnapshotIn =
        serde_json::from_str(content).map_err(|e| ImportError::MalformedSnapshot {
            path: path.to_path_buf(),
            source: e,
        })?;
    let stored = snapshot.logfile;
    let fallback_origin = path.display().to_string();

    let mut collection = LogCollection::new(stored.name, stored.kind);
    for source in &stored.sources {
        collection.note_source(source);
    }

    for envelope in stored.content {
        let e = envelope.logfile_entry;
        let timestamp = parse_iso_timestamp(&e.timestamp.datetime).ok_or_else(|| {
            ImportError::UnparsableTimestamp {
                path: path.to_path_buf(),
                record: e.id,
                raw: e.timestamp.datetime.clone(),
            }
        })?;
        collection.push(LogEntry {
            sequence_id: e.id,
            origin: e.origin_name.unwrap_or_else(|| fallback_origin.clone()),
            source: e.source,
            timestamp,
            message: e.message,
            raw: e.structured_data.unwrap_or_default(),
            hostname: e.hostname,
        });
    }

    tracing::debug!(
        file = %path.display(),
        name = %collection.name,
        entries = collection.len(),
        "Snapshot loaded"
    );
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::syslog::parse_syslog;
    use crate::core::timestamp::TimestampPolicy;

    fn sample() -> LogCollection {
        let content = "Jan  1 00:00:01 host sshd[1]: login\n  detail\n\
                       2018-03-01T10:00:00.123456+01:00 host cron: tick\n";
        parse_syslog(content, "/var/log/sample.log", &TimestampPolicy::default()).collection
    }

    fn export(c: &LogCollection, sparse: bool) -> String {
        let mut buf = Vec::new();
        let n = write_snapshot(c, &mut buf, sparse, Path::new("out.slogviz.json")).unwrap();
        assert_eq!(n, c.len());
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_round_trip_is_exact() {
        let original = sample();
        let text = export(&original, false);
        let back = parse_snapshot(&text, Path::new("sample.log.slogviz.json")).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_sparse_round_trip_clears_raw_only() {
        let original = sample();
        let text = export(&original, true);
        assert!(!text.contains("structured_data"));

        let back = parse_snapshot(&text, Path::new("sample.log.slogviz.json")).unwrap();
        let mut expected = original.clone();
        for e in &mut expected.entries {
            e.raw.clear();
        }
        assert_eq!(back, expected);
    }

    #[test]
    fn test_envelope_shape() {
        let text = export(&sample(), false);
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["logfile"]["type"], "syslog");
        assert_eq!(v["logfile"]["lines"], 2);
        let first = &v["logfile"]["content"][0]["logfile_entry"];
        assert_eq!(first["id"], 1);
        assert_eq!(first["timestamp"]["datetime"], "2017-01-01T00:00:01+00:00");
        assert_eq!(first["source"], "sshd");
    }

    #[test]
    fn test_legacy_snapshot_without_origin() {
        let text = r#"{"logfile": {"name": "places.sqlite", "lines": 1, "type": "firefox_sqlite",
            "content": [{"logfile_entry": {"id": 7, "message": "https://www.rust-lang.org/",
            "structured_data": "", "timestamp": {"datetime": "2017-05-01T12:00:00"},
            "hostname": null, "source": "rust-lang"}}], "sources": ["rust-lang"]}}"#;
        let c = parse_snapshot(text, Path::new("old.slogviz.json")).unwrap();
        assert_eq!(c.format_kind, FormatKind::HistoryDb);
        assert_eq!(c.entries[0].origin, "old.slogviz.json");
        assert_eq!(c.entries[0].sequence_id, 7);
        assert_eq!(c.sources, vec!["rust-lang"]);
    }

    #[test]
    fn test_bad_timestamp_fails_whole_import() {
        let text = r#"{"logfile": {"name": "a.log", "lines": 1, "type": "syslog",
            "content": [{"logfile_entry": {"id": 3, "message": "m",
            "timestamp": {"datetime": "not a date"}, "source": ""}}], "sources": []}}"#;
        let err = parse_snapshot(text, Path::new("a.log.slogviz.json")).unwrap_err();
        assert!(matches!(err, ImportError::UnparsableTimestamp { record: 3, .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_snapshot("{\"entries\": []}", Path::new("x.slogviz.json")).unwrap_err();
        assert!(matches!(err, ImportError::MalformedSnapshot { .. }));
    }
}
