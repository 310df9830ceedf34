// SLogViz - core/analysis.rs
//
// Temporal analysis over entry sequences: redundancy collapse, adaptive
// bucketing, out-of-order classification, plus the derived series and
// merged-timeline views.
//
// Every function borrows its input and returns freshly allocated output;
// collections are never modified in place.

use crate::core::filter::{apply_filters, FilterState};
use crate::core::model::{LogCollection, LogEntry};
use crate::util::constants;
use chrono::{DateTime, Duration, FixedOffset};
use serde::Serialize;
use std::collections::HashMap;

/// A group of entries represented by one anchor timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bucket {
    /// Timestamp of the entry that opened the bucket.
    pub anchor: DateTime<FixedOffset>,
    /// Entries assigned to the bucket.
    pub count: usize,
}

/// Result of [`analyze_order`]: two parallel bucket sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderClassification {
    pub in_order: Vec<Bucket>,
    pub out_of_order: Vec<Bucket>,
}

impl OrderClassification {
    pub fn in_order_count(&self) -> usize {
        self.in_order.iter().map(|b| b.count).sum()
    }

    pub fn out_of_order_count(&self) -> usize {
        self.out_of_order.iter().map(|b| b.count).sum()
    }
}

// =============================================================================
// Redundancy collapse
// =============================================================================

/// Drop entries whose timestamp equals that of the entry just before them.
///
/// Only adjacent repeats collapse; the same timestamp reappearing later in
/// the sequence is kept. With `renumber`, the survivors get sequence ids
/// 1..=N in their current order.
pub fn analyze_collapse(entries: &[LogEntry], renumber: bool) -> Vec<LogEntry> {
    let mut kept: Vec<LogEntry> = Vec::with_capacity(entries.len());
    let mut previous: Option<DateTime<FixedOffset>> = None;

    for entry in entries {
        if previous == Some(entry.timestamp) {
            continue;
        }
        previous = Some(entry.timestamp);
        kept.push(entry.clone());
    }

    if renumber {
        for (entry, id) in kept.iter_mut().zip(1u64..) {
            entry.sequence_id = id;
        }
    }

    tracing::trace!(before = entries.len(), after = kept.len(), "Collapsed entries");
    kept
}

// =============================================================================
// Bucketing
// =============================================================================

/// Group entries into adaptive buckets of at most `window` width.
///
/// Entries are walked in order; each bucket is anchored at the timestamp of
/// the entry that opened it, and a new bucket opens as soon as an entry lies
/// more than `window` after the current anchor. Boundaries are therefore not
/// aligned to any wall-clock grid.
pub fn analyze_buckets(entries: &[LogEntry], window: Duration) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = Vec::new();

    for entry in entries {
        match buckets.last_mut() {
            Some(current) if entry.timestamp - current.anchor <= window => current.count += 1,
            _ => buckets.push(Bucket {
                anchor: entry.timestamp,
                count: 1,
            }),
        }
    }

    buckets
}

/// Default bucket width: one hundredth of the time span covered by
/// `entries`, never less than one second.
pub fn default_window(entries: &[LogEntry]) -> Duration {
    let earliest = entries.iter().map(|e| e.timestamp).min();
    let latest = entries.iter().map(|e| e.timestamp).max();
    let span_secs = match (earliest, latest) {
        (Some(a), Some(b)) => (b - a).num_seconds(),
        _ => 0,
    };
    let secs = (span_secs / constants::DEFAULT_BUCKET_DIVISIONS)
        .max(constants::MIN_BUCKET_WINDOW_SECS);
    Duration::seconds(secs)
}

// =============================================================================
// Out-of-order classification
// =============================================================================

/// Split entries into in-order and out-of-order bucket sequences.
///
/// The scan tracks a high-water mark (latest in-order timestamp). An entry
/// at or below the mark, which covers exact repeats, is out of order and is
/// counted in an out-of-order bucket keyed by its own timestamp. Any other
/// entry is in order: it joins the current in-order bucket when it lies
/// within `tolerance` of the mark, otherwise it opens a new one, and it
/// becomes the new mark.
pub fn analyze_order(entries: &[LogEntry], tolerance: Duration) -> OrderClassification {
    let mut result = OrderClassification::default();
    let mut out_index: HashMap<DateTime<FixedOffset>, usize> = HashMap::new();
    let mut high_water: Option<DateTime<FixedOffset>> = None;

    for entry in entries {
        let ts = entry.timestamp;

        if high_water.is_some_and(|mark| ts <= mark) {
            let idx = *out_index.entry(ts).or_insert_with(|| {
                result.out_of_order.push(Bucket { anchor: ts, count: 0 });
                result.out_of_order.len() - 1
            });
            result.out_of_order[idx].count += 1;
            continue;
        }

        match (high_water, result.in_order.last_mut()) {
            (Some(mark), Some(current)) if ts - mark <= tolerance => current.count += 1,
            _ => result.in_order.push(Bucket { anchor: ts, count: 1 }),
        }
        high_water = Some(ts);
    }

    tracing::trace!(
        entries = entries.len(),
        in_order = result.in_order_count(),
        out_of_order = result.out_of_order_count(),
        "Order classification complete"
    );
    result
}

// =============================================================================
// Derived views
// =============================================================================

/// The plotted series of a collection: optionally collapsed (and then
/// renumbered), restricted by `filter`, ordered by sequence id.
pub fn analyze_series(entries: &[LogEntry], collapse: bool, filter: &FilterState) -> Vec<LogEntry> {
    let base = if collapse {
        analyze_collapse(entries, true)
    } else {
        entries.to_vec()
    };

    let mut series: Vec<LogEntry> = apply_filters(&base, filter)
        .into_iter()
        .map(|idx| base[idx].clone())
        .collect();
    series.sort_by_key(|e| e.sequence_id);
    series
}

/// Entries of several collections on one timeline, stably sorted by
/// timestamp. Entries with equal timestamps keep collection order.
pub fn merge_timeline(collections: &[LogCollection]) -> Vec<LogEntry> {
    let mut merged: Vec<LogEntry> = collections
        .iter()
        .flat_map(|c| c.entries.iter().cloned())
        .collect();
    merged.sort_by_key(|e| e.timestamp);
    merged
}
