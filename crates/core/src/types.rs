use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Distances reported by the cane sensors, in centimetres.
pub type Centimeters = f64;

/// Parse an RFC 3339 instant, or an ISO 8601 date-time without an offset
/// (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(e) => raw
            .parse::<NaiveDateTime>()
            .map(|naive| naive.and_utc())
            .map_err(|_| e),
    }
}

/// `deserialize_with` target for stored timestamps; see [`parse_timestamp`].
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}
