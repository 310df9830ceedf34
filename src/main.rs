// SLogViz - main.rs
//
// Batch driver. Handles:
// 1. CLI argument parsing and config.toml loading
// 2. Logging initialisation (debug mode support)
// 3. Glob expansion and parallel import of every named source
// 4. Analysis and correlation, printed as one JSON report on stdout

use clap::Parser;
use serde::Serialize;
use slogviz::app::import::{self, BatchImport, ImportOptions};
use slogviz::app::rule_mgr;
use slogviz::core::analysis::{self, Bucket, OrderClassification};
use slogviz::core::filter::FilterState;
use slogviz::core::model::{CollectionSummary, LogCollection};
use slogviz::core::rules::RuleDefaults;
use slogviz::core::timestamp::{format_timestamp, parse_utc_offset};
use slogviz::platform::config::{self, AppConfig, PlatformPaths};
use slogviz::util::error::{ConfigError, RuleError, SlogvizError};
use slogviz::util::{constants, logging};
use std::path::PathBuf;

/// SLogViz - log ingestion and temporal analysis.
///
/// Imports syslog files, SLogViz JSON snapshots, browser history databases
/// and Windows event logs, then reports time buckets, out-of-order entries
/// and correlation rule hits as JSON.
#[derive(Parser, Debug)]
#[command(name = "slogviz", version, about)]
struct Cli {
    /// Files or glob patterns to import.
    #[arg(required = true)]
    files: Vec<String>,

    /// UTC offset (+HHMM) for syslog dates that carry no timezone.
    #[arg(long = "utc-offset", allow_hyphen_values = true)]
    utc_offset: Option<String>,

    /// Year for syslog dates that carry no year.
    #[arg(long)]
    year: Option<i32>,

    /// Write a `<name>.slogviz.json` snapshot for each imported source.
    #[arg(long)]
    export: bool,

    /// Omit raw record text from exported snapshots.
    #[arg(long)]
    sparse: bool,

    /// Collapse adjacent entries with identical timestamps before analysis.
    #[arg(long)]
    collapse: bool,

    /// Bucket window in seconds (default: 1/100 of each collection's span).
    #[arg(long)]
    window: Option<i64>,

    /// Correlation rule to run over the merged timeline (repeatable).
    #[arg(long = "rule")]
    rules: Vec<String>,

    /// Only analyse entries with these source tags.
    #[arg(long, value_delimiter = ',')]
    sources: Vec<String>,

    /// Only analyse entries whose message matches this regex.
    #[arg(long)]
    grep: Option<String>,

    /// Path to config.toml (default: platform config directory).
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Additional directory containing user-defined rule files.
    #[arg(short = 'r', long = "rules-dir")]
    rules_dir: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

// =============================================================================
// Report shapes
// =============================================================================

#[derive(Debug, Serialize)]
struct Report {
    collections: Vec<CollectionReport>,
    rules: Vec<RuleReport>,
    skipped: Vec<SkippedSource>,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CollectionReport {
    summary: CollectionSummary,
    skipped_records: usize,
    analysed_entries: usize,
    window_secs: i64,
    buckets: Vec<Bucket>,
    order: OrderClassification,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RuleReport {
    rule: String,
    hits: Vec<RuleHit>,
}

#[derive(Debug, Serialize)]
struct RuleHit {
    origin: String,
    sequence_id: u64,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct SkippedSource {
    path: PathBuf,
    reason: String,
}

// =============================================================================
// Driver
// =============================================================================

fn main() {
    let cli = Cli::parse();

    let platform_paths = PlatformPaths::resolve();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| platform_paths.config_file());
    let (app_config, config_warnings) = config::load_config(&config_path);

    logging::init(
        cli.debug,
        app_config.log_level.as_deref(),
        app_config.log_file.as_deref(),
    );

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "{} starting",
        constants::APP_NAME
    );
    for warning in &config_warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    match run(&cli, app_config, &platform_paths, config_warnings) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

/// Returns Ok(false) when no source could be imported.
fn run(
    cli: &Cli,
    mut app_config: AppConfig,
    platform_paths: &PlatformPaths,
    mut warnings: Vec<String>,
) -> slogviz::util::error::Result<bool> {
    apply_overrides(cli, &mut app_config)?;

    let mut filter = FilterState::for_sources(cli.sources.iter().cloned());
    if let Some(pattern) = &cli.grep {
        filter.set_regex(pattern)?;
    }

    let paths = expand_inputs(&cli.files, &mut warnings);
    let options = ImportOptions::from_config(&app_config);
    let BatchImport { reports, skipped } = import::import_batch(&paths, &options);

    let sparse = cli.sparse || app_config.sparse_export;
    let tolerance = chrono::Duration::seconds(app_config.out_of_order_tolerance_secs);

    let mut collection_reports = Vec::with_capacity(reports.len());
    let mut collections: Vec<LogCollection> = Vec::with_capacity(reports.len());

    for report in reports {
        let collection = report.collection;
        let series = analysis::analyze_series(&collection.entries, cli.collapse, &filter);
        let window = app_config
            .bucket_window_secs
            .map(chrono::Duration::seconds)
            .unwrap_or_else(|| analysis::default_window(&series));

        let snapshot = if cli.export {
            match import::export_collection(&collection, sparse) {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!(collection = %collection.name, error = %e, "Export failed");
                    warnings.push(e.to_string());
                    None
                }
            }
        } else {
            None
        };

        collection_reports.push(CollectionReport {
            summary: collection.summary(),
            skipped_records: report.skipped_records,
            analysed_entries: series.len(),
            window_secs: window.num_seconds(),
            buckets: analysis::analyze_buckets(&series, window),
            order: analysis::analyze_order(&series, tolerance),
            snapshot,
        });
        collections.push(collection);
    }

    let rules = run_rules(cli, &app_config, platform_paths, &collections, &mut warnings);

    let imported_any = !collections.is_empty();
    let report = Report {
        collections: collection_reports,
        rules,
        skipped: skipped
            .into_iter()
            .map(|(path, e)| SkippedSource {
                path,
                reason: e.to_string(),
            })
            .collect(),
        warnings,
    };

    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), &report).map_err(|e| {
        SlogvizError::Export(slogviz::util::error::ExportError::Json {
            path: PathBuf::from("<stdout>"),
            source: e,
        })
    })?;
    println!();

    if !imported_any {
        tracing::error!("No source could be imported");
    }
    Ok(imported_any)
}

/// CLI values take precedence over config.toml.
fn apply_overrides(cli: &Cli, app_config: &mut AppConfig) -> Result<(), ConfigError> {
    if let Some(offset) = &cli.utc_offset {
        if parse_utc_offset(offset).is_none() {
            return Err(ConfigError::ValueOutOfRange {
                field: "--utc-offset".to_string(),
                value: offset.clone(),
                expected: "an offset of the form +HHMM or -HHMM".to_string(),
            });
        }
        app_config.utc_offset = offset.clone();
    }

    if let Some(year) = cli.year {
        if !(constants::MIN_REFERENCE_YEAR..=constants::MAX_REFERENCE_YEAR).contains(&year) {
            return Err(ConfigError::ValueOutOfRange {
                field: "--year".to_string(),
                value: year.to_string(),
                expected: format!(
                    "{}-{}",
                    constants::MIN_REFERENCE_YEAR,
                    constants::MAX_REFERENCE_YEAR
                ),
            });
        }
        app_config.reference_year = year;
    }

    if let Some(window) = cli.window {
        if !(constants::MIN_BUCKET_WINDOW_SECS..=constants::MAX_BUCKET_WINDOW_SECS)
            .contains(&window)
        {
            return Err(ConfigError::ValueOutOfRange {
                field: "--window".to_string(),
                value: window.to_string(),
                expected: format!(
                    "{}-{}",
                    constants::MIN_BUCKET_WINDOW_SECS,
                    constants::MAX_BUCKET_WINDOW_SECS
                ),
            });
        }
        app_config.bucket_window_secs = Some(window);
    }

    if let Some(dir) = &cli.rules_dir {
        app_config.user_rule_dir = Some(dir.clone());
    }
    Ok(())
}

/// Expand glob patterns. A pattern that matches nothing, or is not a valid
/// pattern, is passed through literally so its failure shows up in the
/// skipped list.
fn expand_inputs(inputs: &[String], warnings: &mut Vec<String>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(input));
            continue;
        }
        match glob::glob(input) {
            Ok(matches) => {
                let before = paths.len();
                for m in matches {
                    match m {
                        Ok(path) => paths.push(path),
                        Err(e) => {
                            tracing::warn!(pattern = %input, error = %e, "Glob entry unreadable");
                            warnings.push(e.to_string());
                        }
                    }
                }
                if paths.len() == before {
                    tracing::warn!(pattern = %input, "Pattern matched no files");
                    paths.push(PathBuf::from(input));
                }
            }
            Err(e) => {
                tracing::warn!(pattern = %input, error = %e, "Invalid glob pattern");
                paths.push(PathBuf::from(input));
            }
        }
    }
    paths
}

fn run_rules(
    cli: &Cli,
    app_config: &AppConfig,
    platform_paths: &PlatformPaths,
    collections: &[LogCollection],
    warnings: &mut Vec<String>,
) -> Vec<RuleReport> {
    if cli.rules.is_empty() {
        return Vec::new();
    }

    let defaults = RuleDefaults {
        paired_tolerance: chrono::Duration::seconds(app_config.paired_tolerance_secs),
    };
    let user_dir = app_config
        .user_rule_dir
        .as_deref()
        .unwrap_or(&platform_paths.user_rules_dir);
    let (registry, rule_errors) =
        rule_mgr::load_all_rules(Some(user_dir), app_config.enabled_rules.as_deref(), &defaults);
    warnings.extend(rule_errors.iter().map(RuleError::to_string));

    let timeline = analysis::merge_timeline(collections);
    tracing::debug!(entries = timeline.len(), rules = cli.rules.len(), "Running rules");

    let mut reports = Vec::new();
    for name in &cli.rules {
        match registry.correlate(name, &timeline) {
            Ok(hits) => {
                tracing::info!(rule = %name, hits = hits.len(), "Rule evaluated");
                reports.push(RuleReport {
                    rule: name.clone(),
                    hits: hits
                        .into_iter()
                        .map(|e| RuleHit {
                            timestamp: format_timestamp(&e.timestamp),
                            origin: e.origin,
                            sequence_id: e.sequence_id,
                        })
                        .collect(),
                });
            }
            Err(e) => {
                tracing::warn!(rule = %name, error = %e, "Rule not run");
                warnings.push(e.to_string());
            }
        }
    }
    reports
}
