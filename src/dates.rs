//! Tolerant parsing of the date formats found in the wild across RSS and
//! Atom feeds.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Formats tried after the RFC 2822 and RFC 3339 fast paths, for feeds that
/// omit the timezone entirely. Interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// Parses a heterogeneous date string into a canonical UTC timestamp.
///
/// Tries, in order: RFC 822/2822 (`Mon, 02 Jan 2006 15:04:05 +0000`),
/// ISO 8601 / RFC 3339 with or without fractional seconds
/// (`2006-01-02T15:04:05Z`, `2006-01-02T15:04:05.000Z`), and finally a few
/// timezone-less variants interpreted as UTC. The first successful parse
/// wins.
///
/// Returns `None` when every format fails; callers typically default to
/// `Utc::now()`. No error ever escapes this function.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    // Covers ISO 8601 both with and without a fractional-seconds component,
    // and both `Z` and numeric offsets.
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    None
}
