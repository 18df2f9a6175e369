//! Wire timestamps.
//!
//! Backends send times either as RFC 3339 strings or as epoch
//! milliseconds (numbers or digit strings). Both decode to UTC.

use chrono::{DateTime, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

/// Deserialize an optional timestamp from RFC 3339 text or epoch millis.
pub(crate) fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawTimestamp>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawTimestamp::Millis(millis)) => from_millis(millis).map(Some),
        Some(RawTimestamp::Text(text)) => parse_text(&text).map(Some),
    }
}

fn parse_text<E: Error>(text: &str) -> Result<DateTime<Utc>, E> {
    if let Ok(millis) = text.parse::<i64>() {
        return from_millis(millis);
    }
    DateTime::parse_from_rfc3339(text)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| E::custom(format!("invalid timestamp {text:?}: {e}")))
}

fn from_millis<E: Error>(millis: i64) -> Result<DateTime<Utc>, E> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| E::custom(format!("timestamp {millis}ms out of range")))
}
