// SLogViz - core/rules.rs
//
// Correlation rule definitions: TOML parsing, validation and compilation.
// Core layer: accepts TOML strings, never touches the filesystem.
// I/O is handled by app::rule_mgr which feeds content here.

use crate::core::correlation::{
    EntryMatcher, ImbalanceRule, PairedEventRule, RuleRegistry, SampleRule,
};
use crate::util::constants;
use crate::util::error::RuleError;
use chrono::Duration;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

// =============================================================================
// TOML deserialization structures (raw input)
// =============================================================================

/// Raw rule file. Exactly one of the body tables must be present.
#[derive(Debug, Deserialize)]
pub struct RuleDefinition {
    pub rule: RuleMeta,
    #[serde(default)]
    pub paired: Option<PairedDef>,
    #[serde(default)]
    pub imbalance: Option<ImbalanceDef>,
    #[serde(default)]
    pub head: Option<CountDef>,
    #[serde(default)]
    pub tail: Option<CountDef>,
}

#[derive(Debug, Deserialize)]
pub struct RuleMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct PairedDef {
    pub first: MatcherDef,
    pub second: MatcherDef,
    /// Falls back to the configured paired tolerance when absent.
    pub tolerance_secs: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MatcherDef {
    pub message: Option<String>,
    pub origin: Option<String>,
    pub source: Option<String>,
    pub hostname: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImbalanceDef {
    pub open: String,
    pub close: String,
    pub max_lead: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CountDef {
    pub count: usize,
}

// =============================================================================
// Compiled rules
// =============================================================================

/// A validated rule with its regexes compiled.
#[derive(Debug, Clone)]
pub enum CompiledRule {
    Paired(PairedEventRule),
    Imbalance(ImbalanceRule),
    Sample(SampleRule),
}

/// A compiled rule plus its metadata.
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub name: String,
    pub description: String,
    pub rule: CompiledRule,
    pub is_builtin: bool,
}

impl RuleSpec {
    /// Register this rule in `registry` under its name.
    /// Returns true if it replaced an existing rule.
    pub fn register_into(self, registry: &mut RuleRegistry) -> bool {
        match self.rule {
            CompiledRule::Paired(r) => registry.register(self.name, self.description, r),
            CompiledRule::Imbalance(r) => registry.register(self.name, self.description, r),
            CompiledRule::Sample(r) => registry.register(self.name, self.description, r),
        }
    }
}

/// Values rule files may leave out.
#[derive(Debug, Clone, Copy)]
pub struct RuleDefaults {
    pub paired_tolerance: Duration,
}

impl Default for RuleDefaults {
    fn default() -> Self {
        Self {
            paired_tolerance: Duration::seconds(constants::DEFAULT_PAIRED_TOLERANCE_SECS),
        }
    }
}

// =============================================================================
// Validation and compilation
// =============================================================================

/// Parse a TOML string into a `RuleDefinition`.
///
/// `source_path` is used for error messages only (not for I/O).
pub fn parse_rule_toml(toml_content: &str, source_path: &Path) -> Result<RuleDefinition, RuleError> {
    toml::from_str(toml_content).map_err(|e| RuleError::TomlParse {
        path: source_path.to_path_buf(),
        source: e,
    })
}

/// Validate a `RuleDefinition` and compile it into a `RuleSpec`.
pub fn validate_and_compile(
    def: RuleDefinition,
    defaults: &RuleDefaults,
    is_builtin: bool,
) -> Result<RuleSpec, RuleError> {
    let name = def.rule.name.trim().to_string();
    if name.is_empty() {
        return Err(RuleError::MissingField {
            rule: "(empty)".to_string(),
            field: "rule.name",
        });
    }

    let rule = match (def.paired, def.imbalance, def.head, def.tail) {
        (Some(paired), None, None, None) => {
            CompiledRule::Paired(compile_paired(&name, paired, defaults)?)
        }
        (None, Some(imbalance), None, None) => {
            CompiledRule::Imbalance(compile_imbalance(&name, imbalance)?)
        }
        (None, None, Some(head), None) => CompiledRule::Sample(SampleRule::Head(head.count)),
        (None, None, None, Some(tail)) => CompiledRule::Sample(SampleRule::Tail(tail.count)),
        (paired, imbalance, head, tail) => {
            let found = usize::from(paired.is_some())
                + usize::from(imbalance.is_some())
                + usize::from(head.is_some())
                + usize::from(tail.is_some());
            return Err(RuleError::AmbiguousKind { rule: name, found });
        }
    };

    Ok(RuleSpec {
        name,
        description: def.rule.description,
        rule,
        is_builtin,
    })
}

fn compile_paired(
    name: &str,
    def: PairedDef,
    defaults: &RuleDefaults,
) -> Result<PairedEventRule, RuleError> {
    let tolerance = match def.tolerance_secs {
        None => defaults.paired_tolerance,
        Some(secs)
            if (constants::MIN_TOLERANCE_SECS..=constants::MAX_TOLERANCE_SECS).contains(&secs) =>
        {
            Duration::seconds(secs)
        }
        Some(secs) => {
            return Err(RuleError::InvalidValue {
                rule: name.to_string(),
                field: "paired.tolerance_secs",
                value: secs.to_string(),
                expected: format!(
                    "{}-{}",
                    constants::MIN_TOLERANCE_SECS,
                    constants::MAX_TOLERANCE_SECS
                ),
            })
        }
    };

    let first = compile_matcher(name, "paired.first", def.first)?;
    let second = compile_matcher(name, "paired.second", def.second)?;
    Ok(PairedEventRule {
        first,
        second,
        tolerance,
    })
}

fn compile_imbalance(name: &str, def: ImbalanceDef) -> Result<ImbalanceRule, RuleError> {
    if def.open.is_empty() {
        return Err(RuleError::MissingField {
            rule: name.to_string(),
            field: "imbalance.open",
        });
    }
    if def.close.is_empty() {
        return Err(RuleError::MissingField {
            rule: name.to_string(),
            field: "imbalance.close",
        });
    }
    let max_lead = def.max_lead.unwrap_or(constants::DEFAULT_IMBALANCE_MAX_LEAD);
    if max_lead == 0 {
        return Err(RuleError::InvalidValue {
            rule: name.to_string(),
            field: "imbalance.max_lead",
            value: "0".to_string(),
            expected: "1 or more".to_string(),
        });
    }

    Ok(ImbalanceRule {
        open: compile_regex(name, "imbalance.open", &def.open)?,
        close: compile_regex(name, "imbalance.close", &def.close)?,
        max_lead,
    })
}

fn compile_matcher(
    name: &str,
    field: &'static str,
    def: MatcherDef,
) -> Result<EntryMatcher, RuleError> {
    let compile = |pattern: Option<String>| -> Result<Option<Regex>, RuleError> {
        pattern
            .filter(|p| !p.is_empty())
            .map(|p| compile_regex(name, field, &p))
            .transpose()
    };

    let matcher = EntryMatcher {
        message: compile(def.message)?,
        origin: compile(def.origin)?,
        source: compile(def.source)?,
        hostname: compile(def.hostname)?,
    };
    if matcher.message.is_none()
        && matcher.origin.is_none()
        && matcher.source.is_none()
        && matcher.hostname.is_none()
    {
        tracing::warn!(rule = name, field, "Matcher has no patterns and matches every entry");
    }
    Ok(matcher)
}

/// Compile a regex pattern with length validation.
fn compile_regex(rule: &str, field: &'static str, pattern: &str) -> Result<Regex, RuleError> {
    if pattern.len() > constants::MAX_REGEX_PATTERN_LENGTH {
        return Err(RuleError::RegexTooLong {
            rule: rule.to_string(),
            field,
            length: pattern.len(),
            max_length: constants::MAX_REGEX_PATTERN_LENGTH,
        });
    }

    Regex::new(pattern).map_err(|e| RuleError::InvalidRegex {
        rule: rule.to_string(),
        field,
        pattern: pattern.to_string(),
        source: e,
    })
}

// =============================================================================
// Built-in rules (embedded at compile time)
// =============================================================================

/// Embedded TOML content for built-in rules, as (file name, content).
pub fn builtin_rule_sources() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "the_first_50_entries.toml",
            include_str!("../../rules/the_first_50_entries.toml"),
        ),
        (
            "the_last_50_entries.toml",
            include_str!("../../rules/the_last_50_entries.toml"),
        ),
        (
            "event_a_rule_break.toml",
            include_str!("../../rules/event_a_rule_break.toml"),
        ),
        (
            "session_balance.toml",
            include_str!("../../rules/session_balance.toml"),
        ),
    ]
}

/// Load and validate all built-in rules.
///
/// A built-in that fails to compile is logged and skipped; the unit tests
/// below keep that from happening in a release.
pub fn load_builtin_rules(defaults: &RuleDefaults) -> Vec<RuleSpec> {
    let mut rules = Vec::new();

    for (file_name, content) in builtin_rule_sources() {
        let path = Path::new("builtin").join(file_name);
        match parse_rule_toml(content, &path).and_then(|def| validate_and_compile(def, defaults, true)) {
            Ok(spec) => {
                tracing::debug!(rule = %spec.name, "Loaded built-in rule");
                rules.push(spec);
            }
            Err(e) => {
                tracing::error!(file = file_name, error = %e, "Failed to load built-in rule");
            }
        }
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::LogEntry;
    use chrono::{FixedOffset, TimeZone};

    fn compile(toml: &str) -> Result<RuleSpec, RuleError> {
        parse_rule_toml(toml, Path::new("test.toml"))
            .and_then(|def| validate_and_compile(def, &RuleDefaults::default(), false))
    }

    fn entry(id: u64, origin: &str, secs: u32, message: &str) -> LogEntry {
        LogEntry {
            sequence_id: id,
            origin: origin.to_string(),
            source: String::new(),
            timestamp: FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2017, 1, 1, 0, 0, secs)
                .unwrap(),
            message: message.to_string(),
            raw: String::new(),
            hostname: None,
        }
    }

    #[test]
    fn test_all_builtins_compile() {
        let rules = load_builtin_rules(&RuleDefaults::default());
        assert_eq!(rules.len(), builtin_rule_sources().len());
        let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"the_first_50_entries"));
        assert!(names.contains(&"the_last_50_entries"));
        assert!(names.contains(&"event_a_rule_break"));
        assert!(names.contains(&"session_balance"));
        assert!(rules.iter().all(|r| r.is_builtin));
    }

    #[test]
    fn test_builtin_event_a_rule_matches_paths() {
        let mut registry = RuleRegistry::new();
        for spec in load_builtin_rules(&RuleDefaults::default()) {
            spec.register_into(&mut registry);
        }
        let entries = vec![
            entry(1, "/logs/a.log", 0, "event A"),
            entry(2, "/logs/b.log", 4, "event A"),
            entry(3, "/logs/a.log", 30, "event A"),
            entry(4, "/logs/ba.log", 30, "event A"),
        ];
        let hits = registry.correlate("event_a_rule_break", &entries).unwrap();
        assert_eq!(hits.iter().map(|e| e.sequence_id).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_builtin_event_a_rule_uses_configured_tolerance() {
        let entries = vec![
            entry(1, "a.log", 0, "event A"),
            entry(2, "b.log", 8, "event A"),
        ];
        let hits_with = |defaults: &RuleDefaults| {
            let mut registry = RuleRegistry::new();
            for spec in load_builtin_rules(defaults) {
                spec.register_into(&mut registry);
            }
            registry
                .correlate("event_a_rule_break", &entries)
                .unwrap()
                .iter()
                .map(|e| e.sequence_id)
                .collect::<Vec<_>>()
        };

        let wide = RuleDefaults {
            paired_tolerance: Duration::seconds(10),
        };
        assert!(hits_with(&wide).is_empty());
        assert_eq!(hits_with(&RuleDefaults::default()), vec![1, 2]);
    }

    #[test]
    fn test_paired_tolerance_default_and_explicit() {
        let toml = r#"
            [rule]
            name = "p"
            [paired.first]
            message = "x"
            [paired.second]
            message = "y"
        "#;
        match compile(toml).unwrap().rule {
            CompiledRule::Paired(p) => assert_eq!(p.tolerance, Duration::seconds(5)),
            other => panic!("expected paired, got {other:?}"),
        }

        let toml = r#"
            [rule]
            name = "p"
            [paired]
            tolerance_secs = 90
            [paired.first]
            message = "x"
            [paired.second]
            message = "y"
        "#;
        match compile(toml).unwrap().rule {
            CompiledRule::Paired(p) => assert_eq!(p.tolerance, Duration::seconds(90)),
            other => panic!("expected paired, got {other:?}"),
        }
    }

    #[test]
    fn test_imbalance_default_lead() {
        let toml = r#"
            [rule]
            name = "logins"
            [imbalance]
            open = "login"
            close = "logout"
        "#;
        match compile(toml).unwrap().rule {
            CompiledRule::Imbalance(r) => assert_eq!(r.max_lead, 1),
            other => panic!("expected imbalance, got {other:?}"),
        }
    }

    #[test]
    fn test_no_body_or_two_bodies_rejected() {
        let none = "[rule]\nname = \"r\"\n";
        assert!(matches!(
            compile(none),
            Err(RuleError::AmbiguousKind { found: 0, .. })
        ));

        let two = "[rule]\nname = \"r\"\n[head]\ncount = 1\n[tail]\ncount = 1\n";
        assert!(matches!(
            compile(two),
            Err(RuleError::AmbiguousKind { found: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_inputs() {
        let empty_name = "[rule]\nname = \"\"\n[head]\ncount = 1\n";
        assert!(matches!(compile(empty_name), Err(RuleError::MissingField { .. })));

        let bad_regex = "[rule]\nname = \"r\"\n[imbalance]\nopen = \"[\"\nclose = \"x\"\n";
        assert!(matches!(compile(bad_regex), Err(RuleError::InvalidRegex { .. })));

        let long = format!(
            "[rule]\nname = \"r\"\n[imbalance]\nopen = \"{}\"\nclose = \"x\"\n",
            "a".repeat(constants::MAX_REGEX_PATTERN_LENGTH + 1)
        );
        assert!(matches!(compile(&long), Err(RuleError::RegexTooLong { .. })));

        let bad_tolerance = "[rule]\nname = \"r\"\n[paired]\ntolerance_secs = -1\n\
                             [paired.first]\n[paired.second]\n";
        assert!(matches!(compile(bad_tolerance), Err(RuleError::InvalidValue { .. })));

        assert!(matches!(
            parse_rule_toml("not toml [", Path::new("x.toml")),
            Err(RuleError::TomlParse { .. })
        ));
    }
}
