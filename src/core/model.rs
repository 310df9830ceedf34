// SLogViz - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers:
// importers produce them, analysis and correlation read them.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// =============================================================================
// Log Entry (normalised output of every importer)
// =============================================================================

/// One normalised record, whatever format it came from.
///
/// Entries are only ever created by an importer (or the snapshot reader) and
/// are treated as immutable afterwards; derived views clone them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// Position of the record within its collection, assigned at parse time in
    /// file order. Unique and positive within a collection.
    pub sequence_id: u64,

    /// Identifier of the source file the entry came from.
    pub origin: String,

    /// Finer-grained tag (process name, provider, site) used for filtering.
    /// Empty when the format yields none.
    pub source: String,

    /// Absolute point in time, with the offset it was normalised to.
    pub timestamp: DateTime<FixedOffset>,

    /// Human-readable payload, including any joined continuation lines.
    pub message: String,

    /// Original record text (line, serialised row or event document).
    /// Empty when dropped by a sparse export.
    pub raw: String,

    /// Originating host, when the format records one.
    pub hostname: Option<String>,
}

// =============================================================================
// Format kind
// =============================================================================

/// Which importer produced a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    Syslog,
    JsonSnapshot,
    #[serde(alias = "firefox_sqlite")]
    HistoryDb,
    #[serde(alias = "evtx")]
    EventLog,
}

impl FormatKind {
    /// Stable tag used in snapshots and reports.
    pub fn tag(&self) -> &'static str {
        match self {
            FormatKind::Syslog => "syslog",
            FormatKind::JsonSnapshot => "json_snapshot",
            FormatKind::HistoryDb => "history_db",
            FormatKind::EventLog => "event_log",
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

// =============================================================================
// Log Collection
// =============================================================================

/// One imported source: its entries in parse order plus the distinct source
/// tags seen, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogCollection {
    /// Stable identifier (original path, or the name stored in a snapshot).
    pub name: String,

    /// Importer that produced the collection.
    pub format_kind: FormatKind,

    /// Entries in parse order.
    pub entries: Vec<LogEntry>,

    /// Distinct non-empty `source` values, first-seen order.
    pub sources: Vec<String>,
}

impl LogCollection {
    pub fn new(name: impl Into<String>, format_kind: FormatKind) -> Self {
        Self {
            name: name.into(),
            format_kind,
            entries: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Append an entry, recording its source tag if it has not been seen yet.
    pub fn push(&mut self, entry: LogEntry) {
        self.note_source(&entry.source);
        self.entries.push(entry);
    }

    /// Record a source tag without adding an entry. Empty tags are ignored.
    pub fn note_source(&mut self, source: &str) {
        if !source.is_empty() && !self.sources.iter().any(|s| s == source) {
            self.sources.push(source.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summary statistics for reporting.
    pub fn summary(&self) -> CollectionSummary {
        let earliest = self.entries.iter().map(|e| e.timestamp).min();
        let latest = self.entries.iter().map(|e| e.timestamp).max();
        CollectionSummary {
            name: self.name.clone(),
            format_kind: self.format_kind,
            entry_count: self.entries.len(),
            source_count: self.sources.len(),
            earliest,
            latest,
        }
    }
}

// =============================================================================
// Summaries
// =============================================================================

/// Per-collection statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSummary {
    pub name: String,
    pub format_kind: FormatKind,
    pub entry_count: usize,
    pub source_count: usize,
    pub earliest: Option<DateTime<FixedOffset>>,
    pub latest: Option<DateTime<FixedOffset>>,
}

/// Outcome of importing one source: the collection plus record-level
/// failures that were skipped along the way.
#[derive(Debug)]
pub struct ImportReport {
    pub collection: LogCollection,

    /// Records skipped because they could not be decoded.
    pub skipped_records: usize,

    /// The first few record-level errors, capped at
    /// `MAX_RECORD_ERRORS_PER_SOURCE`.
    pub record_errors: Vec<crate::util::error::ImportError>,
}

impl ImportReport {
    pub fn clean(collection: LogCollection) -> Self {
        Self {
            collection,
            skipped_records: 0,
            record_errors: Vec::new(),
        }
    }
}
