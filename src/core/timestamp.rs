// SLogViz - core/timestamp.rs
//
// Timestamp normalisation: every importer funnels its format-native date
// strings (or epoch counters) through here to obtain a timezone-aware
// `DateTime<FixedOffset>`.
//
// Two policies:
//   - Short-form syslog dates ("Jan  5 14:30:22") carry neither year nor
//     zone; the caller's `TimestampPolicy` supplies both.
//   - Precise ISO-8601 dates carry their own offset and 1-6 fractional
//     digits; they are parsed as-is.
//
// Functions return `Option`: a string that does not parse is a signal to the
// importer (continuation line, skipped record, fatal snapshot) and the
// importer decides what that means.

use crate::util::constants;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc};
use std::borrow::Cow;

// =============================================================================
// Policy
// =============================================================================

/// How to complete timestamps that lack a year or a timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampPolicy {
    /// Year assigned to year-less dates.
    pub reference_year: i32,

    /// Offset assumed for zone-less dates.
    pub utc_offset: FixedOffset,
}

impl Default for TimestampPolicy {
    fn default() -> Self {
        Self {
            reference_year: constants::DEFAULT_REFERENCE_YEAR,
            utc_offset: Utc.fix(),
        }
    }
}

impl TimestampPolicy {
    /// Build a policy from a year and a `±HHMM` (or `±HH:MM`) offset string.
    /// Returns `None` if the offset string is malformed.
    pub fn new(reference_year: i32, utc_offset: &str) -> Option<Self> {
        Some(Self {
            reference_year,
            utc_offset: parse_utc_offset(utc_offset)?,
        })
    }
}

/// Parse a `±HHMM` or `±HH:MM` offset string.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    let (sign, digits) = match raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

// =============================================================================
// Parsers
// =============================================================================

/// Parse a syslog short-form date (`Mon DD HH:MM:SS`, day possibly
/// space-padded) using the policy's year and offset.
pub fn parse_short_date(raw: &str, policy: &TimestampPolicy) -> Option<DateTime<FixedOffset>> {
    // Collapse the space padding ("Jan  5") so a single format covers both.
    let compact = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let with_year = format!("{} {compact}", policy.reference_year);
    let ndt = NaiveDateTime::parse_from_str(&with_year, "%Y %b %d %H:%M:%S").ok()?;
    policy.utc_offset.from_local_datetime(&ndt).single()
}

/// Parse a precise ISO-8601 date with an embedded offset, e.g.
/// `2018-03-01T10:00:00.123456+01:00`. The colon in the offset is optional.
pub fn parse_precise_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(&normalise_offset(raw.trim())).ok()
}

/// Parse a snapshot timestamp. Accepts whole or fractional seconds, with an
/// offset (colon optional, or `Z`) or without one; zone-less values are UTC.
pub fn parse_iso_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    if let Some(dt) = parse_precise_date(trimmed) {
        return Some(dt);
    }

    let spaced = trimmed.replacen(' ', "T", 1);
    NaiveDateTime::parse_from_str(&spaced, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(&spaced, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|ndt| ndt.and_utc().fixed_offset())
}

/// Parse an event-log creation time. The container stores UTC with a fixed
/// fractional part (`2016-07-08T18:12:51.681640Z`); older decoders render it
/// as `2016-07-08 18:12:51.681640`.
pub fn parse_event_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|ndt| ndt.and_utc().fixed_offset())
}

/// Convert a microsecond counter measured from an epoch `epoch_offset_secs`
/// seconds before 1970-01-01 into a UTC timestamp at whole-second resolution.
pub fn from_epoch_micros(micros: i64, epoch_offset_secs: i64) -> Option<DateTime<FixedOffset>> {
    let secs = micros.div_euclid(1_000_000).checked_sub(epoch_offset_secs)?;
    DateTime::from_timestamp(secs, 0).map(|dt| dt.fixed_offset())
}

/// Render a timestamp the way snapshots store it: RFC 3339 with as many
/// fractional digits as needed and a `+HH:MM` offset.
pub fn format_timestamp(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Insert the colon into a trailing `±HHMM` offset so RFC 3339 parsing
/// accepts it. Strings without such a suffix are returned unchanged.
fn normalise_offset(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    if bytes.len() < 6 || !s.contains('T') {
        return Cow::Borrowed(s);
    }
    let tail = &bytes[bytes.len() - 5..];
    let is_compact = (tail[0] == b'+' || tail[0] == b'-')
        && tail[1..].iter().all(u8::is_ascii_digit)
        && bytes[bytes.len() - 6].is_ascii_digit();
    if !is_compact {
        return Cow::Borrowed(s);
    }
    let split = s.len() - 2;
    Cow::Owned(format!("{}:{}", &s[..split], &s[split..]))
}
