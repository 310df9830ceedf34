// SLogViz - tests/e2e_import.rs
//
// End-to-end tests for the import, analysis and correlation pipeline.
//
// These tests exercise the real filesystem, real SQLite databases built in
// temporary directories, the embedded rule set and real chrono timestamp
// parsing. Nothing is mocked.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use rusqlite::Connection;
use slogviz::app::import::{export_collection, import_batch, import_collection, ImportOptions};
use slogviz::app::rule_mgr::load_all_rules;
use slogviz::core::analysis::{
    analyze_buckets, analyze_collapse, analyze_order, analyze_series, merge_timeline,
};
use slogviz::core::filter::FilterState;
use slogviz::core::model::{FormatKind, LogCollection};
use slogviz::core::rules::RuleDefaults;
use slogviz::util::error::{ImportError, RecordError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

/// Absolute path to the on-disk fixture files.
fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap().fixed_offset()
}

fn import(path: &Path) -> LogCollection {
    import_collection(path, &ImportOptions::default())
        .unwrap_or_else(|e| panic!("import of {} failed: {e}", path.display()))
        .collection
}

/// 2017-01-01T00:00:00Z in microseconds since 1601-01-01.
const WEBKIT_2017: i64 = (1_483_228_800 + 11_644_473_600) * 1_000_000;

/// 2017-01-01T00:00:00Z in microseconds since 1970-01-01.
const UNIX_2017: i64 = 1_483_228_800 * 1_000_000;

fn build_chromium_history(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE urls (id INTEGER PRIMARY KEY, url TEXT, title TEXT, visit_count INTEGER);
         CREATE TABLE visits (id INTEGER PRIMARY KEY, url INTEGER, visit_time INTEGER, transition INTEGER);
         INSERT INTO urls VALUES (1, 'https://www.example.com/page', 'Example', 2);
         INSERT INTO urls VALUES (2, 'about:blank', NULL, 1);
         INSERT INTO urls VALUES (3, NULL, 'broken', 1);",
    )
    .unwrap();
    let rows = [
        (1, 1, WEBKIT_2017, 0),
        (2, 1, WEBKIT_2017 + 90_000_000, 1),
        (3, 2, WEBKIT_2017 + 120_000_000, 1),
        (4, 3, WEBKIT_2017 + 150_000_000, 1),
    ];
    for (id, url, time, transition) in rows {
        conn.execute(
            "INSERT INTO visits VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, url, time, transition],
        )
        .unwrap();
    }
}

fn build_firefox_places(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE moz_places (id INTEGER PRIMARY KEY, url TEXT, title TEXT, visit_count INTEGER);
         CREATE TABLE moz_historyvisits (id INTEGER PRIMARY KEY, place_id INTEGER, visit_date INTEGER, visit_type INTEGER);
         INSERT INTO moz_places VALUES (1, 'https://docs.rs/regex', 'regex', 1);",
    )
    .unwrap();
    conn.execute(
        "INSERT INTO moz_historyvisits VALUES (7, 1, ?1, 1)",
        rusqlite::params![UNIX_2017 + 5_500_000],
    )
    .unwrap();
}

// =============================================================================
// Syslog
// =============================================================================

#[test]
fn e2e_syslog_fixture_reconstructs_records() {
    let c = import(&fixture("sample_messages.log"));

    assert_eq!(c.format_kind, FormatKind::Syslog);
    assert_eq!(c.len(), 5, "suppression line must not produce an entry");
    let ids: Vec<u64> = c.entries.iter().map(|e| e.sequence_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    assert_eq!(c.sources, vec!["sshd", "cron", "kernel"]);
    assert_eq!(c.entries[2].message, "job started\n  with continuation\n");
    assert_eq!(c.entries[0].hostname.as_deref(), Some("host1"));
    assert_eq!(c.entries[0].timestamp, utc(2017, 1, 1, 0, 0, 1));
    assert_eq!(
        c.entries[4].timestamp,
        utc(2017, 1, 1, 0, 1, 10) + Duration::microseconds(123_456)
    );
}

#[test]
fn e2e_syslog_reference_year_and_offset_apply() {
    let options = ImportOptions {
        policy: slogviz::core::timestamp::TimestampPolicy::new(2020, "-0500").unwrap(),
        ..ImportOptions::default()
    };
    let c = import_collection(&fixture("sample_messages.log"), &options)
        .unwrap()
        .collection;
    // 00:00:01 at -05:00 is 05:00:01 UTC.
    assert_eq!(c.entries[0].timestamp, utc(2020, 1, 1, 5, 0, 1));
    // Precise dates keep their own offset.
    assert_eq!(
        c.entries[4].timestamp,
        utc(2017, 1, 1, 0, 1, 10) + Duration::microseconds(123_456)
    );
}

#[test]
fn e2e_syslog_analysis_pipeline() {
    let c = import(&fixture("sample_messages.log"));

    let collapsed = analyze_collapse(&c.entries, false);
    assert_eq!(collapsed.len(), 4);
    assert_eq!(analyze_collapse(&collapsed, false), collapsed);

    let buckets = analyze_buckets(&c.entries, Duration::seconds(10));
    assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), c.len());

    let order = analyze_order(&c.entries, Duration::seconds(60));
    assert_eq!(order.in_order_count(), 3);
    assert_eq!(order.out_of_order_count(), 2);
    assert_eq!(order.in_order.len(), 2);

    let sshd_only = analyze_series(&c.entries, true, &FilterState::for_sources(["sshd"]));
    assert_eq!(sshd_only.len(), 2);
    assert!(sshd_only.iter().all(|e| e.source == "sshd"));
}

// =============================================================================
// Snapshot
// =============================================================================

#[test]
fn e2e_legacy_snapshot_accepts_mixed_timestamps() {
    let path = fixture("legacy_export.slogviz.json");
    let c = import(&path);

    assert_eq!(c.name, "places.sqlite");
    assert_eq!(c.format_kind, FormatKind::HistoryDb);
    assert_eq!(c.len(), 3);
    assert_eq!(c.sources, vec!["example", "docs"]);
    assert_eq!(c.entries[0].timestamp, utc(2017, 3, 4, 10, 0, 0));
    assert_eq!(
        c.entries[1].timestamp,
        utc(2017, 3, 4, 9, 0, 1) + Duration::milliseconds(500)
    );
    assert_eq!(
        c.entries[2].timestamp,
        utc(2017, 3, 4, 9, 0, 2) + Duration::microseconds(123_456)
    );
    // No stored origin: entries are attributed to the snapshot file.
    assert_eq!(c.entries[0].origin, path.display().to_string());
    assert_eq!(c.entries[1].raw, "");
}

#[test]
fn e2e_export_round_trip_exact_and_sparse() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("messages.log");
    std::fs::copy(fixture("sample_messages.log"), &log).unwrap();
    let original = import(&log);

    let exported = export_collection(&original, false).unwrap();
    assert_eq!(exported, dir.path().join("messages.log.slogviz.json"));
    assert_eq!(import(&exported), original);

    let sparse = export_collection(&original, true).unwrap();
    let restored = import(&sparse);
    assert_eq!(restored.len(), original.len());
    for (r, o) in restored.entries.iter().zip(&original.entries) {
        assert_eq!(r.raw, "");
        assert_eq!(r.message, o.message);
        assert_eq!(r.timestamp, o.timestamp);
        assert_eq!(r.origin, o.origin);
    }
}

#[test]
fn e2e_snapshot_with_bad_timestamp_fails_whole_import() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.slogviz.json");
    std::fs::write(
        &path,
        r#"{"logfile":{"name":"x","lines":1,"type":"syslog","sources":[],"content":[
            {"logfile_entry":{"id":4,"message":"m","timestamp":{"datetime":"yesterday"},"hostname":null,"source":""}}]}}"#,
    )
    .unwrap();
    let err = import_collection(&path, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, ImportError::UnparsableTimestamp { record: 4, .. }));
}

// =============================================================================
// History databases
// =============================================================================

#[test]
fn e2e_chromium_history_import() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("History");
    build_chromium_history(&path);

    let report = import_collection(&path, &ImportOptions::default()).unwrap();
    assert_eq!(report.skipped_records, 1, "row with NULL url is skipped");
    assert_eq!(report.record_errors.len(), 1);
    assert!(matches!(
        report.record_errors[0],
        ImportError::MalformedRecord {
            reason: RecordError::Undecodable { .. },
            ..
        }
    ));

    let mut entries = report.collection.entries.clone();
    entries.sort_by_key(|e| e.sequence_id);
    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0].sequence_id, 1);
    assert_eq!(entries[0].timestamp, utc(2017, 1, 1, 0, 0, 0));
    assert_eq!(entries[0].source, "example");
    assert_eq!(entries[0].message, "https://www.example.com/page");
    assert_eq!(entries[0].hostname, None);
    assert!(entries[0].raw.contains("\"visit_count\":2"));

    assert_eq!(entries[1].timestamp, utc(2017, 1, 1, 0, 1, 30));
    assert_eq!(entries[2].source, "", "no domain pattern gives an empty source");
    assert_eq!(report.collection.format_kind, FormatKind::HistoryDb);
}

#[test]
fn e2e_firefox_places_import() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("places.sqlite");
    build_firefox_places(&path);

    let c = import(&path);
    assert_eq!(c.len(), 1);
    assert_eq!(c.entries[0].sequence_id, 7);
    assert_eq!(c.entries[0].source, "docs");
    // Whole-second resolution.
    assert_eq!(c.entries[0].timestamp, utc(2017, 1, 1, 0, 0, 5));
}

#[test]
fn e2e_history_that_is_not_a_database_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("History");
    std::fs::write(&path, "plain text, not sqlite").unwrap();
    let err = import_collection(&path, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, ImportError::ResourceUnavailable { .. }));
}

// =============================================================================
// Event log and batch behaviour
// =============================================================================

#[test]
fn e2e_garbage_event_log_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("System.evtx");
    std::fs::write(&path, b"this is not an event log file").unwrap();
    let err = import_collection(&path, &ImportOptions::default()).unwrap_err();
    assert!(matches!(err, ImportError::ResourceUnavailable { .. }));
}

#[test]
fn e2e_batch_skips_unsupported_and_broken_sources() {
    let dir = TempDir::new().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "not a log").unwrap();
    let missing = dir.path().join("missing.log");
    let places = dir.path().join("places.sqlite");
    build_firefox_places(&places);

    let paths = vec![
        fixture("sample_messages.log"),
        notes.clone(),
        missing.clone(),
        places.clone(),
    ];
    let batch = import_batch(&paths, &ImportOptions::default());

    assert_eq!(batch.reports.len(), 2);
    assert_eq!(batch.reports[0].collection.format_kind, FormatKind::Syslog);
    assert_eq!(batch.reports[1].collection.format_kind, FormatKind::HistoryDb);

    assert_eq!(batch.skipped.len(), 2);
    assert_eq!(batch.skipped[0].0, notes);
    assert!(matches!(batch.skipped[0].1, ImportError::UnsupportedFormat { .. }));
    assert_eq!(batch.skipped[1].0, missing);
    assert!(matches!(batch.skipped[1].1, ImportError::ResourceUnavailable { .. }));
}

// =============================================================================
// Correlation over a merged timeline
// =============================================================================

#[test]
fn e2e_builtin_rules_over_merged_timeline() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.log");
    let b = dir.path().join("b.log");
    std::fs::write(
        &a,
        "Jan  1 00:00:01 hostA app: event A\nJan  1 00:00:30 hostA app: event A\n",
    )
    .unwrap();
    std::fs::write(&b, "Jan  1 00:00:03 hostB app: event A\n").unwrap();

    let batch = import_batch(&[a.clone(), b], &ImportOptions::default());
    let collections: Vec<LogCollection> = batch.collections().cloned().collect();
    let timeline = merge_timeline(&collections);
    assert_eq!(timeline.len(), 3);

    let (registry, errors) = load_all_rules(None, None, &RuleDefaults::default());
    assert!(errors.is_empty());

    let hits = registry.correlate("event_a_rule_break", &timeline).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].origin, a.display().to_string());
    assert_eq!(hits[0].sequence_id, 2);

    let first = registry.correlate("the_first_50_entries", &timeline).unwrap();
    assert_eq!(first.len(), 3);

    assert!(registry.correlate("no_such_rule", &timeline).is_err());
}

#[test]
fn e2e_session_balance_on_fixture() {
    let c = import(&fixture("sample_messages.log"));
    let (registry, _) = load_all_rules(None, None, &RuleDefaults::default());
    let hits = registry.correlate("session_balance", &c.entries).unwrap();
    let ids: Vec<u64> = hits.iter().map(|e| e.sequence_id).collect();
    assert_eq!(ids, vec![2]);
}
