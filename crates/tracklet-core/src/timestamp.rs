//! Millisecond-precision UTC timestamps.
//!
//! Stored and wire timestamps use one fixed shape: UTC with exactly three
//! fraction digits, e.g. `2017-01-08T06:35:14.240Z`. Parsing accepts any
//! RFC 3339 offset form and normalizes to UTC, so hand-written fixtures and
//! foreign payloads load cleanly.

use chrono::{DateTime, SecondsFormat, Utc};

/// Render a timestamp in the canonical millisecond form.
pub fn format_ms(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp, normalizing to UTC.
pub fn parse_ms(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let parsed = DateTime::parse_from_rfc3339(raw)?;
    Ok(parsed.with_timezone(&Utc))
}

/// Current UTC time truncated to whole milliseconds.
///
/// Stamps must round-trip through the canonical form unchanged, so the
/// sub-millisecond tail is dropped before a timestamp ever reaches a record.
pub fn now_ms() -> DateTime<Utc> {
    truncate_ms(Utc::now())
}

/// Drop sub-millisecond precision.
pub fn truncate_ms(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

/// Serde adapter for the canonical millisecond form.
///
/// Use with `#[serde(with = "timestamp::iso_millis")]`.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_ms(at))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_ms(&raw).map_err(serde::de::Error::custom)
    }
}
