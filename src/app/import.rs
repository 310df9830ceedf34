// SLogViz - app/import.rs
//
// Import orchestration: dispatch a path to its importer, run the importer
// against the file or database, and export collections back to disk.
//
// - Each importer owns its file handle or database connection for the
//   duration of one call; it is dropped on every exit path.
// - Record-level failures (history rows, event-log records) are counted and
//   kept up to MAX_RECORD_ERRORS_PER_SOURCE; they never fail the import.
// - A batch never aborts: sources that fail are returned beside the
//   collections that succeeded.

use crate::core::dispatch::{self, HistorySchema, SourceFormat};
use crate::core::eventlog;
use crate::core::history::{self, HistoryRow};
use crate::core::model::{FormatKind, ImportReport, LogCollection};
use crate::core::snapshot;
use crate::core::syslog;
use crate::core::timestamp::TimestampPolicy;
use crate::platform::config::AppConfig;
use crate::platform::fs;
use crate::util::constants;
use crate::util::error::{ExportError, ImportError, RecordError};
use rayon::prelude::*;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Instant;

// =============================================================================
// Options
// =============================================================================

/// Per-import settings.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// Year and offset given to syslog dates that carry neither.
    pub policy: TimestampPolicy,

    /// Text files at or above this many bytes are memory-mapped.
    pub large_file_threshold: u64,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            policy: TimestampPolicy::default(),
            large_file_threshold: constants::DEFAULT_LARGE_FILE_THRESHOLD,
        }
    }
}

impl ImportOptions {
    /// Options from a validated config. The config loader has already
    /// rejected bad offsets, so the fallback is never expected to apply.
    pub fn from_config(config: &AppConfig) -> Self {
        let policy = TimestampPolicy::new(config.reference_year, &config.utc_offset)
            .unwrap_or_else(|| {
                tracing::warn!(offset = %config.utc_offset, "Invalid UTC offset, using +0000");
                TimestampPolicy {
                    reference_year: config.reference_year,
                    ..TimestampPolicy::default()
                }
            });
        Self {
            policy,
            large_file_threshold: config.large_file_threshold,
        }
    }
}

// =============================================================================
// Single-source import
// =============================================================================

/// Import one source, selecting the importer from its file name.
pub fn import_collection(path: &Path, options: &ImportOptions) -> Result<ImportReport, ImportError> {
    let format = dispatch::dispatch(path)?;
    let started = Instant::now();

    let report = match format {
        SourceFormat::Syslog => import_syslog(path, options),
        SourceFormat::JsonSnapshot => import_snapshot(path, options),
        SourceFormat::HistoryDb(schema) => import_history(path, schema),
        SourceFormat::EventLog => import_event_log(path),
    }?;

    tracing::info!(
        file = %path.display(),
        format = %format.format_kind(),
        entries = report.collection.len(),
        sources = report.collection.sources.len(),
        skipped = report.skipped_records,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Source imported"
    );
    Ok(report)
}

fn import_syslog(path: &Path, options: &ImportOptions) -> Result<ImportReport, ImportError> {
    let content = fs::read_text_lossy(path, options.large_file_threshold)
        .map_err(|e| ImportError::io(path, "read log file", e))?;

    let origin = path.display().to_string();
    let parsed = syslog::parse_syslog(&content, &origin, &options.policy);

    tracing::debug!(
        file = %path.display(),
        lines = parsed.lines_processed,
        suppressed = parsed.suppressed,
        orphaned = parsed.orphaned,
        "Syslog parsed"
    );
    Ok(ImportReport::clean(parsed.collection))
}

fn import_snapshot(path: &Path, options: &ImportOptions) -> Result<ImportReport, ImportError> {
    let content = fs::read_text_lossy(path, options.large_file_threshold)
        .map_err(|e| ImportError::io(path, "read snapshot", e))?;
    snapshot::parse_snapshot(&content, path).map(ImportReport::clean)
}

/// Collects capped record-level errors for one source.
struct RecordErrors<'a> {
    path: &'a Path,
    skipped: usize,
    errors: Vec<ImportError>,
}

impl<'a> RecordErrors<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            skipped: 0,
            errors: Vec::new(),
        }
    }

    fn record(&mut self, record: u64, reason: RecordError) {
        self.skipped += 1;
        tracing::debug!(file = %self.path.display(), record, reason = %reason, "Record skipped");
        if self.errors.len() < constants::MAX_RECORD_ERRORS_PER_SOURCE {
            self.errors.push(ImportError::MalformedRecord {
                path: self.path.to_path_buf(),
                record,
                reason,
            });
        }
    }

    fn finish(self, collection: LogCollection) -> ImportReport {
        if self.skipped > 0 {
            tracing::warn!(
                file = %self.path.display(),
                skipped = self.skipped,
                "Some records could not be decoded"
            );
        }
        ImportReport {
            collection,
            skipped_records: self.skipped,
            record_errors: self.errors,
        }
    }
}

fn import_history(path: &Path, schema: HistorySchema) -> Result<ImportReport, ImportError> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| ImportError::unavailable(path, "open history database", e))?;

    let mut stmt = conn
        .prepare(history::visit_query(schema))
        .map_err(|e| ImportError::unavailable(path, "query history database", e))?;
    let mut rows = stmt
        .query([])
        .map_err(|e| ImportError::unavailable(path, "query history database", e))?;

    let origin = path.display().to_string();
    let kind = SourceFormat::HistoryDb(schema).format_kind();
    let mut collection = LogCollection::new(origin.as_str(), kind);
    let mut errors = RecordErrors::new(path);
    let mut row_index: u64 = 0;

    loop {
        let row = match rows.next() {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) => return Err(ImportError::unavailable(path, "read history rows", e)),
        };
        row_index += 1;

        let decoded = (|| -> rusqlite::Result<HistoryRow> {
            Ok(HistoryRow {
                visit_id: row.get(0)?,
                url: row.get(1)?,
                visit_time: row.get(2)?,
                title: row.get(3)?,
                visit_count: row.get(4)?,
                transition: row.get(5)?,
            })
        })();

        let entry = decoded
            .map_err(|e| RecordError::Undecodable {
                message: e.to_string(),
            })
            .and_then(|r| history::entry_from_row(&r, schema, &origin));
        match entry {
            Ok(entry) => collection.push(entry),
            Err(reason) => errors.record(row_index, reason),
        }
    }

    Ok(errors.finish(collection))
}

fn import_event_log(path: &Path) -> Result<ImportReport, ImportError> {
    let mut parser =
        evtx::EvtxParser::from_path(path).map_err(|e| ImportError::ResourceUnavailable {
            path: path.to_path_buf(),
            operation: "open event log",
            source: e.to_string().into(),
        })?;

    let origin = path.display().to_string();
    let mut collection = LogCollection::new(origin.as_str(), FormatKind::EventLog);
    let mut errors = RecordErrors::new(path);

    for (index, record) in parser.records_json_value().enumerate() {
        let position = index as u64 + 1;
        match record {
            Ok(record) => {
                match eventlog::entry_from_event(&record.data, record.event_record_id, &origin) {
                    Ok(entry) => collection.push(entry),
                    Err(reason) => errors.record(record.event_record_id, reason),
                }
            }
            Err(e) => errors.record(
                position,
                RecordError::Undecodable {
                    message: e.to_string(),
                },
            ),
        }
    }

    Ok(errors.finish(collection))
}

// =============================================================================
// Batch import
// =============================================================================

/// Result of importing several sources.
#[derive(Debug, Default)]
pub struct BatchImport {
    /// Successful imports, in input order.
    pub reports: Vec<ImportReport>,

    /// Sources that could not be imported, in input order.
    pub skipped: Vec<(PathBuf, ImportError)>,
}

impl BatchImport {
    /// Imported collections, in input order.
    pub fn collections(&self) -> impl Iterator<Item = &LogCollection> {
        self.reports.iter().map(|r| &r.collection)
    }
}

/// Import every path in parallel. Failed sources are collected, never fatal.
pub fn import_batch(paths: &[PathBuf], options: &ImportOptions) -> BatchImport {
    let results: Vec<(PathBuf, Result<ImportReport, ImportError>)> = paths
        .par_iter()
        .map(|p| (p.clone(), import_collection(p, options)))
        .collect();

    let mut batch = BatchImport::default();
    for (path, result) in results {
        match result {
            Ok(report) => batch.reports.push(report),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Source skipped");
                batch.skipped.push((path, e));
            }
        }
    }

    tracing::info!(
        imported = batch.reports.len(),
        skipped = batch.skipped.len(),
        "Batch import complete"
    );
    batch
}

// =============================================================================
// Export
// =============================================================================

/// Snapshot file name for a collection: `<name>.slogviz.json`.
pub fn snapshot_path(collection: &LogCollection) -> PathBuf {
    PathBuf::from(format!("{}{}", collection.name, constants::SNAPSHOT_SUFFIX))
}

/// Export `collection` to [`snapshot_path`]. Returns the path written.
pub fn export_collection(collection: &LogCollection, sparse: bool) -> Result<PathBuf, ExportError> {
    let path = snapshot_path(collection);
    export_collection_to(collection, &path, sparse)?;
    Ok(path)
}

/// Export `collection` to `path` atomically (write temp, then rename).
pub fn export_collection_to(
    collection: &LogCollection,
    path: &Path,
    sparse: bool,
) -> Result<usize, ExportError> {
    let io_err = |p: &Path, e: std::io::Error| ExportError::Io {
        path: p.to_path_buf(),
        source: e,
    };

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let file = std::fs::File::create(&tmp).map_err(|e| io_err(&tmp, e))?;
    let mut writer = std::io::BufWriter::new(file);
    let written = snapshot::write_snapshot(collection, &mut writer, sparse, path)
        .and_then(|n| {
            use std::io::Write;
            writer.flush().map_err(|e| io_err(&tmp, e))?;
            Ok(n)
        });
    drop(writer);

    let written = match written {
        Ok(n) => n,
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
    };

    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        io_err(path, e)
    })?;

    tracing::info!(path = %path.display(), entries = written, sparse, "Snapshot exported");
    Ok(written)
}
