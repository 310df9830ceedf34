// SLogViz - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every tunable default that the import or analysis layers rely on lives
// here so it can be audited (and overridden through config.toml) in one place.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "SLogViz";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "slogviz";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Import: timestamp normalisation
// =============================================================================

/// Year assigned to syslog short-form dates, which carry no year of their own.
pub const DEFAULT_REFERENCE_YEAR: i32 = 2017;

/// Lowest accepted `[import] reference_year`.
pub const MIN_REFERENCE_YEAR: i32 = 1970;

/// Highest accepted `[import] reference_year`.
pub const MAX_REFERENCE_YEAR: i32 = 9999;

/// UTC offset applied to syslog short-form dates, which carry no timezone.
pub const DEFAULT_UTC_OFFSET: &str = "+0000";

/// Seconds between 1601-01-01T00:00:00Z (Chromium/WebKit epoch) and the
/// Unix epoch.
pub const WEBKIT_EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

// =============================================================================
// Import: limits
// =============================================================================

/// File size threshold in bytes above which text sources are memory-mapped
/// instead of read into a heap buffer.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 100 * 1024 * 1024; // 100 MB

/// Maximum number of record-level errors kept per source. Further malformed
/// records are still counted, just not retained individually.
pub const MAX_RECORD_ERRORS_PER_SOURCE: usize = 1_000;

/// Suffix of files written by the snapshot exporter.
pub const SNAPSHOT_SUFFIX: &str = ".slogviz.json";

// =============================================================================
// Analysis defaults
// =============================================================================

/// Default tolerance (seconds) for out-of-order classification. An in-order
/// entry within this distance of the high-water mark joins the current bucket.
pub const DEFAULT_OUT_OF_ORDER_TOLERANCE_SECS: i64 = 60;

/// Default symmetric tolerance (seconds) for paired-event matching.
pub const DEFAULT_PAIRED_TOLERANCE_SECS: i64 = 5;

/// Smallest configurable tolerance (seconds) for either analysis.
pub const MIN_TOLERANCE_SECS: i64 = 0;

/// Largest configurable tolerance (seconds): one day.
pub const MAX_TOLERANCE_SECS: i64 = 86_400;

/// Number of buckets the default histogram window aims for: with no explicit
/// window the collection's time span is divided by this value.
pub const DEFAULT_BUCKET_DIVISIONS: i64 = 100;

/// Lower bound on the derived default bucket window (seconds).
pub const MIN_BUCKET_WINDOW_SECS: i64 = 1;

/// Upper bound on a configured bucket window (seconds): one year.
pub const MAX_BUCKET_WINDOW_SECS: i64 = 366 * 86_400;

// =============================================================================
// Correlation rules
// =============================================================================

/// Maximum number of correlation rules that can be registered from files.
pub const MAX_RULES: usize = 100;

/// Maximum size of a rule TOML file in bytes.
pub const MAX_RULE_FILE_SIZE: u64 = 64 * 1024; // 64 KB

/// Maximum regex pattern length to prevent ReDoS.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4_096;

/// Default lead that "open" events may hold over "close" events in an
/// imbalance rule.
pub const DEFAULT_IMBALANCE_MAX_LEAD: u64 = 1;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// User rules subdirectory name.
pub const RULES_DIR_NAME: &str = "rules";
