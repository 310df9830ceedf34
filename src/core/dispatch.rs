// SLogViz - core/dispatch.rs
//
// Importer selection by file name. No content sniffing: the decision is made
// from the path text alone, so the dispatcher never touches the filesystem.

use crate::core::model::FormatKind;
use crate::util::constants;
use crate::util::error::ImportError;
use std::path::Path;

/// Browser history schema variants. They differ in table names and in the
/// epoch their microsecond visit counters are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySchema {
    /// `urls` + `visits`, microseconds since 1601-01-01.
    Chromium,
    /// `moz_places` + `moz_historyvisits`, microseconds since 1970-01-01.
    Firefox,
}

impl HistorySchema {
    /// Seconds between the schema's epoch and the Unix epoch.
    pub fn epoch_offset_secs(&self) -> i64 {
        match self {
            HistorySchema::Chromium => constants::WEBKIT_EPOCH_OFFSET_SECS,
            HistorySchema::Firefox => 0,
        }
    }
}

/// The importer a path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Syslog,
    JsonSnapshot,
    HistoryDb(HistorySchema),
    EventLog,
}

impl SourceFormat {
    /// The collection tag the importer stamps on its output.
    pub fn format_kind(&self) -> FormatKind {
        match self {
            SourceFormat::Syslog => FormatKind::Syslog,
            SourceFormat::JsonSnapshot => FormatKind::JsonSnapshot,
            SourceFormat::HistoryDb(_) => FormatKind::HistoryDb,
            SourceFormat::EventLog => FormatKind::EventLog,
        }
    }
}

/// Select the importer for `path`.
///
/// Rules, first match wins:
///   - ends with `log`                      -> syslog
///   - ends with `.slogviz.json`            -> snapshot
///   - ends with `History`                  -> history database, Chromium schema
///   - contains `places`, ends with `.sqlite` -> history database, Firefox schema
///   - ends with `.evtx`                    -> event log
pub fn dispatch(path: &Path) -> Result<SourceFormat, ImportError> {
    let name = path.to_string_lossy();

    let format = if name.ends_with("log") {
        SourceFormat::Syslog
    } else if name.ends_with(constants::SNAPSHOT_SUFFIX) {
        SourceFormat::JsonSnapshot
    } else if name.ends_with("History") {
        SourceFormat::HistoryDb(HistorySchema::Chromium)
    } else if name.contains("places") && name.ends_with(".sqlite") {
        SourceFormat::HistoryDb(HistorySchema::Firefox)
    } else if name.ends_with(".evtx") {
        SourceFormat::EventLog
    } else {
        tracing::debug!(file = %path.display(), "No importer matches file name");
        return Err(ImportError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    };

    tracing::trace!(file = %path.display(), format = ?format, "Importer selected");
    Ok(format)
}
