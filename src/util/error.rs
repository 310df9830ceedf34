// SLogViz - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation: every variant carries the path or rule
// it concerns and, where one exists, the underlying cause via `source()`.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Boxed cause for failures that originate in heterogeneous backends
/// (filesystem, SQLite, EVTX parser).
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all SLogViz operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum SlogvizError {
    /// Importing a source failed.
    Import(ImportError),

    /// Correlation rule loading, validation or lookup failed.
    Rule(RuleError),

    /// Snapshot export failed.
    Export(ExportError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// A filter expression could not be compiled.
    Filter(FilterError),
}

impl fmt::Display for SlogvizError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Import(e) => write!(f, "Import error: {e}"),
            Self::Rule(e) => write!(f, "Rule error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Filter(e) => write!(f, "Filter error: {e}"),
        }
    }
}

impl std::error::Error for SlogvizError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Import(e) => Some(e),
            Self::Rule(e) => Some(e),
            Self::Export(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Filter(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Import errors
// ---------------------------------------------------------------------------

/// Errors raised while selecting or running an importer.
///
/// Source-level variants (`UnsupportedFormat`, `ResourceUnavailable`,
/// `UnparsableTimestamp`, `MalformedSnapshot`) fail the import of one source.
/// `MalformedRecord` is record-level: importers collect it, count it and
/// carry on.
#[derive(Debug)]
pub enum ImportError {
    /// No importer recognises the file name.
    UnsupportedFormat { path: PathBuf },

    /// The file or database could not be opened or read.
    ResourceUnavailable {
        path: PathBuf,
        operation: &'static str,
        source: BoxedCause,
    },

    /// A snapshot entry carries a timestamp none of the accepted ISO-8601
    /// shapes can parse. Fatal for the whole snapshot.
    UnparsableTimestamp {
        path: PathBuf,
        record: u64,
        raw: String,
    },

    /// The snapshot is not valid JSON or does not have the collection shape.
    MalformedSnapshot {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A single record (database row, event-log record) could not be decoded.
    MalformedRecord {
        path: PathBuf,
        record: u64,
        reason: RecordError,
    },
}

impl ImportError {
    /// Wrap an I/O failure on `path`.
    pub fn io(path: impl Into<PathBuf>, operation: &'static str, source: io::Error) -> Self {
        Self::ResourceUnavailable {
            path: path.into(),
            operation,
            source: Box::new(source),
        }
    }

    /// Wrap a backend failure (SQLite, EVTX) on `path`.
    pub fn unavailable(
        path: impl Into<PathBuf>,
        operation: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ResourceUnavailable {
            path: path.into(),
            operation,
            source: Box::new(source),
        }
    }

    /// The path this error refers to.
    pub fn path(&self) -> &Path {
        match self {
            Self::UnsupportedFormat { path }
            | Self::ResourceUnavailable { path, .. }
            | Self::UnparsableTimestamp { path, .. }
            | Self::MalformedSnapshot { path, .. }
            | Self::MalformedRecord { path, .. } => path,
        }
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat { path } => {
                write!(f, "'{}': no importer for this file name", path.display())
            }
            Self::ResourceUnavailable {
                path,
                operation,
                source,
            } => write!(
                f,
                "'{}': cannot {operation}: {source}",
                path.display()
            ),
            Self::UnparsableTimestamp { path, record, raw } => write!(
                f,
                "'{}' entry {record}: cannot parse timestamp '{raw}'",
                path.display()
            ),
            Self::MalformedSnapshot { path, source } => {
                write!(f, "'{}': malformed snapshot: {source}", path.display())
            }
            Self::MalformedRecord {
                path,
                record,
                reason,
            } => write!(f, "'{}' record {record}: {reason}", path.display()),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ResourceUnavailable { source, .. } => Some(source.as_ref()),
            Self::MalformedSnapshot { source, .. } => Some(source),
            Self::MalformedRecord { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl From<ImportError> for SlogvizError {
    fn from(e: ImportError) -> Self {
        Self::Import(e)
    }
}

/// Why one database row or event-log record was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// A required element or column is absent.
    MissingField(&'static str),

    /// The record id is zero or negative.
    NonPositiveId { id: i64 },

    /// An epoch-based time does not fit the supported date range.
    TimeOutOfRange { value: i64 },

    /// A textual time could not be parsed.
    BadTime { raw: String },

    /// The backend could not decode the record at all.
    Undecodable { message: String },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "no {field}"),
            Self::NonPositiveId { id } => write!(f, "record id {id} is not positive"),
            Self::TimeOutOfRange { value } => write!(f, "time {value} is out of range"),
            Self::BadTime { raw } => write!(f, "bad creation time '{raw}'"),
            Self::Undecodable { message } => write!(f, "cannot decode record: {message}"),
        }
    }
}

impl std::error::Error for RecordError {}

// ---------------------------------------------------------------------------
// Rule errors
// ---------------------------------------------------------------------------

/// Errors related to correlation rule definitions and lookup.
#[derive(Debug)]
pub enum RuleError {
    /// TOML file could not be parsed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Rule file exceeds the maximum allowed size.
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// A required field is missing or empty.
    MissingField {
        rule: String,
        field: &'static str,
    },

    /// The rule file defines no rule body, or more than one.
    AmbiguousKind { rule: String, found: usize },

    /// A regex pattern in the rule is invalid.
    InvalidRegex {
        rule: String,
        field: &'static str,
        pattern: String,
        source: regex::Error,
    },

    /// A regex pattern exceeds the maximum allowed length.
    RegexTooLong {
        rule: String,
        field: &'static str,
        length: usize,
        max_length: usize,
    },

    /// A numeric setting is outside its allowed range.
    InvalidValue {
        rule: String,
        field: &'static str,
        value: String,
        expected: String,
    },

    /// Maximum number of rules exceeded.
    TooManyRules { count: usize, max: usize },

    /// `correlate` was asked for a name nobody registered.
    UnknownRule { name: String },

    /// I/O error reading a rule file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Failed to parse TOML '{}': {source}", path.display())
            }
            Self::FileTooLarge {
                path,
                size,
                max_size,
            } => write!(
                f,
                "Rule file '{}' is {size} bytes, exceeds maximum of {max_size} bytes",
                path.display()
            ),
            Self::MissingField { rule, field } => {
                write!(f, "Rule '{rule}': missing required field '{field}'")
            }
            Self::AmbiguousKind { rule, found } => write!(
                f,
                "Rule '{rule}': expected exactly one of [paired], [imbalance], \
                 [head], [tail]; found {found}"
            ),
            Self::InvalidRegex {
                rule,
                field,
                pattern,
                source,
            } => write!(
                f,
                "Rule '{rule}': invalid regex in '{field}' ('{pattern}'): {source}"
            ),
            Self::RegexTooLong {
                rule,
                field,
                length,
                max_length,
            } => write!(
                f,
                "Rule '{rule}': regex in '{field}' is {length} chars, \
                 exceeds maximum of {max_length}"
            ),
            Self::InvalidValue {
                rule,
                field,
                value,
                expected,
            } => write!(
                f,
                "Rule '{rule}': '{field}' = {value} is out of range. Expected: {expected}"
            ),
            Self::TooManyRules { count, max } => {
                write!(f, "Too many rules loaded ({count}), maximum is {max}")
            }
            Self::UnknownRule { name } => write!(f, "No correlation rule named '{name}'"),
            Self::Io { path, source } => {
                write!(f, "I/O error reading rule '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for RuleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::InvalidRegex { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<RuleError> for SlogvizError {
    fn from(e: RuleError) -> Self {
        Self::Rule(e)
    }
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

/// Errors related to snapshot export.
#[derive(Debug)]
pub enum ExportError {
    /// I/O error writing the export file.
    Io { path: PathBuf, source: io::Error },

    /// JSON serialisation error.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Export I/O error '{}': {source}", path.display())
            }
            Self::Json { path, source } => {
                write!(f, "JSON export error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

impl From<ExportError> for SlogvizError {
    fn from(e: ExportError) -> Self {
        Self::Export(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for SlogvizError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Filter errors
// ---------------------------------------------------------------------------

/// Errors related to filter construction.
#[derive(Debug)]
pub enum FilterError {
    /// The message regex is invalid.
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegex { pattern, source } => {
                write!(f, "Invalid filter regex '{pattern}': {source}")
            }
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRegex { source, .. } => Some(source),
        }
    }
}

impl From<FilterError> for SlogvizError {
    fn from(e: FilterError) -> Self {
        Self::Filter(e)
    }
}

/// Convenience type alias for SLogViz results.
pub type Result<T> = std::result::Result<T, SlogvizError>;
