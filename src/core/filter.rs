// SLogViz - core/filter.rs
//
// Composable filter over log entries.
// All active filters are AND-combined.
// Core layer: pure logic, no I/O.

use crate::core::model::LogEntry;
use crate::util::error::FilterError;
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use std::collections::HashSet;

/// Complete filter state. All fields are AND-combined when applied.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    /// `source` tags to include (empty = all).
    pub sources: HashSet<String>,

    /// Collection origins to include (empty = all).
    pub origins: HashSet<String>,

    /// Start of time range (inclusive). None = no lower bound.
    pub time_start: Option<DateTime<FixedOffset>>,

    /// End of time range (inclusive). None = no upper bound.
    pub time_end: Option<DateTime<FixedOffset>>,

    /// Substring search over `message` (case-insensitive). Empty = no filter.
    pub text_search: String,

    /// Compiled regex over `message`. None = no regex filter.
    pub regex_search: Option<Regex>,
}

impl FilterState {
    /// Returns true if no filters are active.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
            && self.origins.is_empty()
            && self.time_start.is_none()
            && self.time_end.is_none()
            && self.text_search.is_empty()
            && self.regex_search.is_none()
    }

    /// Filter that keeps only the given source tags.
    pub fn for_sources<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set the regex search pattern, compiling it.
    /// An empty pattern clears the regex filter.
    pub fn set_regex(&mut self, pattern: &str) -> Result<(), FilterError> {
        if pattern.is_empty() {
            self.regex_search = None;
            return Ok(());
        }
        let regex = Regex::new(pattern).map_err(|e| FilterError::InvalidRegex {
            pattern: pattern.to_string(),
            source: e,
        })?;
        self.regex_search = Some(regex);
        Ok(())
    }
}

/// Apply filters to a slice of entries, returning indices of matching entries.
///
/// Indices point into the original slice; entries are never copied here.
pub fn apply_filters(entries: &[LogEntry], filter: &FilterState) -> Vec<usize> {
    if filter.is_empty() {
        return (0..entries.len()).collect();
    }

    let text_lower = filter.text_search.to_lowercase();

    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| matches_all(entry, filter, &text_lower))
        .map(|(idx, _)| idx)
        .collect()
}

/// Check if a single entry matches all active filters.
fn matches_all(entry: &LogEntry, filter: &FilterState, text_lower: &str) -> bool {
    if !filter.sources.is_empty() && !filter.sources.contains(&entry.source) {
        return false;
    }

    if !filter.origins.is_empty() && !filter.origins.contains(&entry.origin) {
        return false;
    }

    if filter.time_start.is_some_and(|start| entry.timestamp < start) {
        return false;
    }
    if filter.time_end.is_some_and(|end| entry.timestamp > end) {
        return false;
    }

    if !text_lower.is_empty() && !entry.message.to_lowercase().contains(text_lower) {
        return false;
    }

    if let Some(ref regex) = filter.regex_search {
        if !regex.is_match(&entry.message) {
            return false;
        }
    }

    true
}
