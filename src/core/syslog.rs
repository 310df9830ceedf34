// SLogViz - core/syslog.rs
//
// Line-oriented syslog parsing with multi-line record reconstruction.
// Core layer: operates on in-memory content, never touches the filesystem.
//
// Every physical line is classified, in this order:
//   1. short-date record   `Jan  5 14:30:22 host proc[42]: message`
//   2. repeat suppression  `... --- last message repeated 3 times ---`
//   3. precise-date record `2018-03-01T10:00:00.123+01:00 host proc: message`
//   4. continuation of the most recent record
//
// `sequence_id` counts logical records, not physical lines: suppressed and
// continuation lines never advance it.

use crate::core::model::{FormatKind, LogCollection, LogEntry};
use crate::core::timestamp::{parse_precise_date, parse_short_date, TimestampPolicy};
use chrono::{DateTime, FixedOffset};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Outcome of parsing one syslog text.
#[derive(Debug)]
pub struct SyslogParse {
    /// Reconstructed records.
    pub collection: LogCollection,

    /// Physical lines read.
    pub lines_processed: u64,

    /// "last message repeated" lines discarded.
    pub suppressed: u64,

    /// Continuation lines seen before the first record, discarded.
    pub orphaned: u64,
}

struct SyslogPatterns {
    short: Regex,
    suppressed: Regex,
    precise: Regex,
}

fn patterns() -> &'static SyslogPatterns {
    static PATTERNS: OnceLock<SyslogPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // Groups: 1 date, 2 host, 3 process, 4 optional [pid], 5 message.
        // The leading \D{3} keeps precise-date lines out of the short pattern.
        const TAIL: &str = r"\s(\S+)\s([^\]\[:]+)(\[\d+\])?[^:]*:\s(.*)$";
        let re = |pat: &str| Regex::new(pat).expect("syslog pattern must compile");
        SyslogPatterns {
            short: re(&format!(r"^(\D{{3}}\s+\d+\s\d{{2}}:\d{{2}}:\d{{2}}){TAIL}")),
            suppressed: re(r"^.*---\slast\smessage\srepeated\s\d+\stimes?\s---$"),
            precise: re(&format!(
                r"^(\d{{4}}-\d{{2}}-\d{{2}}T\d{{2}}:\d{{2}}:\d{{2}}\.\d{{1,6}}[+-]\d{{2}}:?\d{{2}}){TAIL}"
            )),
        }
    })
}

/// Parse syslog `content` into a collection named `origin`.
///
/// Short-form dates are completed with `policy`; precise dates keep their
/// own offset. A line whose header matches but whose date does not parse is
/// handled as a continuation line.
pub fn parse_syslog(content: &str, origin: &str, policy: &TimestampPolicy) -> SyslogParse {
    let patterns = patterns();
    let mut collection = LogCollection::new(origin, FormatKind::Syslog);
    let mut next_id: u64 = 1;
    let mut lines_processed: u64 = 0;
    let mut suppressed: u64 = 0;
    let mut orphaned: u64 = 0;

    // Terminator of the line that opened the current record. It is only
    // written into the record once a continuation line extends it.
    let mut pending_terminator: Option<&str> = None;

    for physical in content.split_inclusive('\n') {
        lines_processed += 1;
        let (line, terminator) = split_terminator(physical);

        let short = patterns
            .short
            .captures(line)
            .and_then(|caps| parse_short_date(&caps[1], policy).map(|ts| (caps, ts)));
        if let Some((caps, ts)) = short {
            collection.push(build_entry(next_id, origin, &caps, ts, line));
            next_id += 1;
            pending_terminator = Some(terminator);
            continue;
        }

        if patterns.suppressed.is_match(line) {
            suppressed += 1;
            continue;
        }

        let precise = patterns
            .precise
            .captures(line)
            .and_then(|caps| parse_precise_date(&caps[1]).map(|ts| (caps, ts)));
        if let Some((caps, ts)) = precise {
            collection.push(build_entry(next_id, origin, &caps, ts, line));
            next_id += 1;
            pending_terminator = Some(terminator);
            continue;
        }

        match collection.entries.last_mut() {
            Some(last) => {
                if let Some(t) = pending_terminator.take() {
                    last.message.push_str(t);
                    last.raw.push_str(t);
                }
                last.message.push_str(physical);
                last.raw.push_str(physical);
            }
            None => orphaned += 1,
        }
    }

    tracing::debug!(
        origin,
        entries = collection.len(),
        sources = collection.sources.len(),
        lines = lines_processed,
        suppressed,
        orphaned,
        "Syslog parsing complete"
    );

    SyslogParse {
        collection,
        lines_processed,
        suppressed,
        orphaned,
    }
}

fn build_entry(
    sequence_id: u64,
    origin: &str,
    caps: &Captures<'_>,
    timestamp: DateTime<FixedOffset>,
    line: &str,
) -> LogEntry {
    LogEntry {
        sequence_id,
        origin: origin.to_string(),
        source: caps[3].to_string(),
        timestamp,
        message: caps[5].to_string(),
        raw: line.to_string(),
        hostname: Some(caps[2].to_string()),
    }
}

/// Split a physical line into its text and its terminator (`\n`, `\r\n` or
/// nothing for a final unterminated line).
fn split_terminator(physical: &str) -> (&str, &str) {
    let body_len = physical
        .strip_suffix("\r\n")
        .or_else(|| physical.strip_suffix('\n'))
        .map_or(physical.len(), str::len);
    physical.split_at(body_len)
}
