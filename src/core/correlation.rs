// SLogViz - core/correlation.rs
//
// Correlation rules: functions from an ordered entry sequence to the subset
// of entries worth a closer look. Rules are registered under a name and
// invoked through `RuleRegistry::correlate`.
//
// Two canonical shapes are provided as types (paired-event matching and
// open/close imbalance counting); any closure of the right signature can be
// registered as well.

use crate::core::model::LogEntry;
use crate::util::error::RuleError;
use chrono::Duration;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// A correlation rule. Implementations must not depend on anything but the
/// entries they are given.
pub trait CorrelationRule: Send + Sync {
    /// Return the entries this rule flags, in input order.
    fn evaluate(&self, entries: &[LogEntry]) -> Vec<LogEntry>;
}

impl<F> CorrelationRule for F
where
    F: Fn(&[LogEntry]) -> Vec<LogEntry> + Send + Sync,
{
    fn evaluate(&self, entries: &[LogEntry]) -> Vec<LogEntry> {
        self(entries)
    }
}

// =============================================================================
// Entry matcher
// =============================================================================

/// Predicate over an entry: every pattern that is set must match.
/// A matcher with no patterns matches everything.
#[derive(Debug, Clone, Default)]
pub struct EntryMatcher {
    pub message: Option<Regex>,
    pub origin: Option<Regex>,
    pub source: Option<Regex>,
    pub hostname: Option<Regex>,
}

impl EntryMatcher {
    pub fn matches(&self, entry: &LogEntry) -> bool {
        fn check(re: &Option<Regex>, text: &str) -> bool {
            re.as_ref().map_or(true, |re| re.is_match(text))
        }

        check(&self.message, &entry.message)
            && check(&self.origin, &entry.origin)
            && check(&self.source, &entry.source)
            && match (&self.hostname, &entry.hostname) {
                (None, _) => true,
                (Some(re), Some(host)) => re.is_match(host),
                (Some(_), None) => false,
            }
    }
}

// =============================================================================
// Paired-event matching
// =============================================================================

/// Flags entries of one kind that have no counterpart of the other kind
/// within `tolerance`, in either direction of time.
///
/// Every candidate is checked against the whole sequence, so cost is
/// quadratic in the number of entries.
#[derive(Debug, Clone)]
pub struct PairedEventRule {
    pub first: EntryMatcher,
    pub second: EntryMatcher,
    pub tolerance: Duration,
}

impl PairedEventRule {
    /// True if some entry other than `entries[index]` satisfies `other` within
    /// tolerance. An entry never pairs with itself, even when both matchers
    /// accept it.
    fn has_counterpart(&self, index: usize, other: &EntryMatcher, entries: &[LogEntry]) -> bool {
        let entry = &entries[index];
        entries.iter().enumerate().any(|(j, y)| {
            j != index
                && other.matches(y)
                && (entry.timestamp - y.timestamp).abs() <= self.tolerance
        })
    }
}

impl CorrelationRule for PairedEventRule {
    fn evaluate(&self, entries: &[LogEntry]) -> Vec<LogEntry> {
        entries
            .iter()
            .enumerate()
            .filter(|(i, x)| {
                if self.first.matches(x) {
                    !self.has_counterpart(*i, &self.second, entries)
                } else if self.second.matches(x) {
                    !self.has_counterpart(*i, &self.first, entries)
                } else {
                    false
                }
            })
            .map(|(_, x)| x.clone())
            .collect()
    }
}

// =============================================================================
// Imbalance counting
// =============================================================================

/// Tracks opens and closes (for example session opened/closed) and flags the
/// entries that break the alternation.
///
/// An open is accepted while opens lead closes by at most `max_lead`; a
/// close is accepted while closes do not exceed opens. A rejected entry is
/// flagged and does not count, so later entries are judged as if it never
/// happened.
#[derive(Debug, Clone)]
pub struct ImbalanceRule {
    pub open: Regex,
    pub close: Regex,
    /// How far opens may run ahead of closes. With `max_lead = 2`, the
    /// sequence open, open, open, close flags only the third open.
    pub max_lead: u64,
}

impl CorrelationRule for ImbalanceRule {
    fn evaluate(&self, entries: &[LogEntry]) -> Vec<LogEntry> {
        let mut opens: u64 = 0;
        let mut closes: u64 = 0;
        let mut flagged = Vec::new();

        for entry in entries {
            if self.open.is_match(&entry.message) {
                if opens + 1 > closes + self.max_lead {
                    flagged.push(entry.clone());
                } else {
                    opens += 1;
                }
            } else if self.close.is_match(&entry.message) {
                if closes + 1 > opens {
                    flagged.push(entry.clone());
                } else {
                    closes += 1;
                }
            }
        }

        flagged
    }
}

// =============================================================================
// Sampling
// =============================================================================

/// The first or last `n` entries. Mostly useful as a template and to check
/// that a rule pipeline is wired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleRule {
    Head(usize),
    Tail(usize),
}

impl CorrelationRule for SampleRule {
    fn evaluate(&self, entries: &[LogEntry]) -> Vec<LogEntry> {
        match *self {
            SampleRule::Head(n) => entries.iter().take(n).cloned().collect(),
            SampleRule::Tail(n) => entries[entries.len().saturating_sub(n)..].to_vec(),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

struct RegisteredRule {
    description: String,
    rule: Box<dyn CorrelationRule>,
}

/// Name -> rule mapping, populated at startup.
#[derive(Default)]
pub struct RuleRegistry {
    rules: BTreeMap<String, RegisteredRule>,
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `rule` under `name`, replacing any rule of the same name.
    /// Returns true if a rule was replaced.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        rule: impl CorrelationRule + 'static,
    ) -> bool {
        let name = name.into();
        tracing::debug!(rule = %name, "Registering correlation rule");
        self.rules
            .insert(
                name,
                RegisteredRule {
                    description: description.into(),
                    rule: Box::new(rule),
                },
            )
            .is_some()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn description(&self, name: &str) -> Option<&str> {
        self.rules.get(name).map(|r| r.description.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run the rule called `name` over `entries`.
    pub fn correlate(&self, name: &str, entries: &[LogEntry]) -> Result<Vec<LogEntry>, RuleError> {
        let registered = self.rules.get(name).ok_or_else(|| RuleError::UnknownRule {
            name: name.to_string(),
        })?;
        let hits = registered.rule.evaluate(entries);
        tracing::debug!(rule = name, entries = entries.len(), hits = hits.len(), "Rule evaluated");
        Ok(hits)
    }
}
