// SLogViz - platform/config.rs
//
// Platform directory resolution and config.toml loading with validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows) and
// Library (macOS) locations. Every value read from config.toml is checked
// against the limits in util::constants; a bad value produces a warning and
// the default is kept.

use crate::core::timestamp::parse_utc_offset;
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for SLogViz configuration and user rules.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/slogviz/ or %APPDATA%\slogviz\config\)
    pub config_dir: PathBuf,

    /// User rule directory (e.g. ~/.config/slogviz/rules/)
    pub user_rules_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let user_rules_dir = config_dir.join(constants::RULES_DIR_NAME);

            tracing::debug!(
                config = %config_dir.display(),
                rules = %user_rules_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                user_rules_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                user_rules_dir: fallback.join(constants::RULES_DIR_NAME),
                config_dir: fallback,
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml shape
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are ignored so a newer config file still loads in an older
/// binary.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub import: ImportSection,
    pub analysis: AnalysisSection,
    pub export: ExportSection,
    pub rules: RulesSection,
    pub logging: LoggingSection,
}

/// `[import]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ImportSection {
    /// Year given to syslog dates that carry none.
    pub reference_year: Option<i32>,
    /// `±HHMM` offset given to syslog dates that carry none.
    pub utc_offset: Option<String>,
    /// Text files at or above this size are memory-mapped.
    pub large_file_threshold_bytes: Option<u64>,
}

/// `[analysis]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub out_of_order_tolerance_secs: Option<i64>,
    pub paired_tolerance_secs: Option<i64>,
    /// Fixed bucket window; unset means span / 100.
    pub bucket_window_secs: Option<i64>,
}

/// `[export]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ExportSection {
    /// Omit raw record text from snapshots.
    pub sparse: Option<bool>,
}

/// `[rules]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RulesSection {
    /// Additional rule directory.
    pub user_rule_directory: Option<String>,
    /// Only these rules are registered. Unset = all.
    pub enabled: Option<Vec<String>>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- Import --
    pub reference_year: i32,
    /// Validated `±HHMM` offset string.
    pub utc_offset: String,
    pub large_file_threshold: u64,

    // -- Analysis --
    pub out_of_order_tolerance_secs: i64,
    pub paired_tolerance_secs: i64,
    pub bucket_window_secs: Option<i64>,

    // -- Export --
    pub sparse_export: bool,

    // -- Rules --
    pub user_rule_dir: Option<PathBuf>,
    pub enabled_rules: Option<Vec<String>>,

    // -- Logging --
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reference_year: constants::DEFAULT_REFERENCE_YEAR,
            utc_offset: constants::DEFAULT_UTC_OFFSET.to_string(),
            large_file_threshold: constants::DEFAULT_LARGE_FILE_THRESHOLD,
            out_of_order_tolerance_secs: constants::DEFAULT_OUT_OF_ORDER_TOLERANCE_SECS,
            paired_tolerance_secs: constants::DEFAULT_PAIRED_TOLERANCE_SECS,
            bucket_window_secs: None,
            sparse_export: false,
            user_rule_dir: None,
            enabled_rules: None,
            log_level: None,
            log_file: None,
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load and validate config.toml at `config_path`.
///
/// Returns the validated config and a list of non-fatal warnings. A missing
/// file yields defaults with no warnings; an unreadable or unparsable file
/// yields defaults with one warning.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            let err = ConfigError::Io {
                path: config_path.to_path_buf(),
                source: e,
            };
            tracing::warn!(error = %err, "Config file unreadable");
            return (AppConfig::default(), vec![format!("{err}. Using defaults.")]);
        }
    };

    let result = parse_config(&content, config_path);
    tracing::info!(path = %config_path.display(), warnings = result.1.len(), "Loaded config.toml");
    result
}

/// Validate config.toml `content`. `source_path` is used for messages only.
pub fn parse_config(content: &str, source_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    let raw: RawConfig = match toml::from_str(content) {
        Ok(r) => r,
        Err(e) => {
            let err = ConfigError::TomlParse {
                path: source_path.to_path_buf(),
                source: e,
            };
            tracing::warn!(error = %err, "Config file unparsable");
            warnings.push(format!("{err}. Using defaults."));
            return (AppConfig::default(), warnings);
        }
    };

    let mut config = AppConfig::default();

    // -- Import: reference_year --
    if let Some(year) = raw.import.reference_year {
        if (constants::MIN_REFERENCE_YEAR..=constants::MAX_REFERENCE_YEAR).contains(&year) {
            config.reference_year = year;
        } else {
            warnings.push(out_of_range(
                "import.reference_year",
                year,
                format!("{}-{}", constants::MIN_REFERENCE_YEAR, constants::MAX_REFERENCE_YEAR),
                constants::DEFAULT_REFERENCE_YEAR,
            ));
        }
    }

    // -- Import: utc_offset --
    if let Some(offset) = raw.import.utc_offset {
        if parse_utc_offset(&offset).is_some() {
            config.utc_offset = offset;
        } else {
            warnings.push(out_of_range(
                "import.utc_offset",
                &offset,
                "an offset of the form +HHMM or -HHMM".to_string(),
                constants::DEFAULT_UTC_OFFSET,
            ));
        }
    }

    // -- Import: large_file_threshold_bytes --
    if let Some(bytes) = raw.import.large_file_threshold_bytes {
        if bytes > 0 {
            config.large_file_threshold = bytes;
        } else {
            warnings.push(out_of_range(
                "import.large_file_threshold_bytes",
                bytes,
                "1 or more".to_string(),
                constants::DEFAULT_LARGE_FILE_THRESHOLD,
            ));
        }
    }

    // -- Analysis: tolerances --
    let tolerance_range = constants::MIN_TOLERANCE_SECS..=constants::MAX_TOLERANCE_SECS;
    let tolerance_expected = format!(
        "{}-{}",
        constants::MIN_TOLERANCE_SECS,
        constants::MAX_TOLERANCE_SECS
    );
    if let Some(secs) = raw.analysis.out_of_order_tolerance_secs {
        if tolerance_range.contains(&secs) {
            config.out_of_order_tolerance_secs = secs;
        } else {
            warnings.push(out_of_range(
                "analysis.out_of_order_tolerance_secs",
                secs,
                tolerance_expected.clone(),
                constants::DEFAULT_OUT_OF_ORDER_TOLERANCE_SECS,
            ));
        }
    }
    if let Some(secs) = raw.analysis.paired_tolerance_secs {
        if tolerance_range.contains(&secs) {
            config.paired_tolerance_secs = secs;
        } else {
            warnings.push(out_of_range(
                "analysis.paired_tolerance_secs",
                secs,
                tolerance_expected,
                constants::DEFAULT_PAIRED_TOLERANCE_SECS,
            ));
        }
    }

    // -- Analysis: bucket_window_secs --
    if let Some(secs) = raw.analysis.bucket_window_secs {
        if (constants::MIN_BUCKET_WINDOW_SECS..=constants::MAX_BUCKET_WINDOW_SECS).contains(&secs) {
            config.bucket_window_secs = Some(secs);
        } else {
            warnings.push(out_of_range(
                "analysis.bucket_window_secs",
                secs,
                format!(
                    "{}-{}",
                    constants::MIN_BUCKET_WINDOW_SECS,
                    constants::MAX_BUCKET_WINDOW_SECS
                ),
                "span / 100",
            ));
        }
    }

    // -- Export --
    if let Some(sparse) = raw.export.sparse {
        config.sparse_export = sparse;
    }

    // -- Rules --
    if let Some(dir) = raw.rules.user_rule_directory.filter(|d| !d.is_empty()) {
        config.user_rule_dir = Some(PathBuf::from(dir));
    }
    config.enabled_rules = raw.rules.enabled;

    // -- Logging: level --
    if let Some(level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level);
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default ({}).",
                constants::DEFAULT_LOG_LEVEL
            ));
        }
    }

    // -- Logging: file --
    if let Some(file) = raw.logging.file.filter(|f| !f.is_empty()) {
        config.log_file = Some(PathBuf::from(file));
    }

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }

    (config, warnings)
}

fn out_of_range(
    field: &str,
    value: impl std::fmt::Display,
    expected: String,
    default: impl std::fmt::Display,
) -> String {
    let err = ConfigError::ValueOutOfRange {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    };
    format!("{err}. Using default ({default}).")
}
