//! Lenient timestamp decoding.
//!
//! The backend emits ISO-8601 timestamps with or without an offset depending on
//! the column type. Offset-less values are UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one interpreted as UTC.
pub(crate) fn parse(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// `deserialize_with` helper for optional timestamps.
///
/// Unparseable values decode as `None` rather than failing the whole record.
pub(crate) fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_parse_with_offset() {
        let ts = parse("2024-05-01T12:30:00+02:00");
        assert_eq!(ts.map(|t| t.hour()), Some(10));
    }

    #[test]
    fn test_parse_naive_as_utc() {
        let ts = parse("2024-05-01T12:30:00.123456");
        assert_eq!(ts.map(|t| (t.day(), t.hour())), Some((1, 12)));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse("yesterday").is_none());
    }
}
