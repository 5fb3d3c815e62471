use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage format for article timestamps. Lexicographic order on strings in
/// this format is chronological order, which the windowed read relies on.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid timestamp {0:?}: expected YYYYMMDDThhmmssZ")]
pub struct InvalidTimestamp(pub String);

/// A UTC instant rendered as `YYYYMMDDThhmmssZ`.
///
/// The only ways to obtain one are [`Timestamp::parse`], which rejects
/// anything that does not round-trip through [`TIMESTAMP_FORMAT`] exactly,
/// and [`Timestamp::from_datetime`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(String);

impl Timestamp {
    pub fn parse(s: &str) -> Result<Self, InvalidTimestamp> {
        let trimmed = s.trim();
        let parsed = NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
            .map_err(|_| InvalidTimestamp(s.to_string()))?;

        // chrono accepts unpadded fields; the stored form must not.
        let canonical = parsed.format(TIMESTAMP_FORMAT).to_string();
        if canonical != trimmed {
            return Err(InvalidTimestamp(s.to_string()));
        }

        Ok(Self(canonical))
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.format(TIMESTAMP_FORMAT).to_string())
    }

    #[cfg(test)]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Timestamp {
    type Err = InvalidTimestamp;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = InvalidTimestamp;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

impl ToSql for Timestamp {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Timestamp {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        Timestamp::parse(raw).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_canonical_form() {
        let ts = Timestamp::parse("20250607T200925Z").unwrap();
        assert_eq!(ts.as_str(), "20250607T200925Z");
    }

    #[test]
    fn rejects_other_formats() {
        for bad in [
            "2025-06-07T20:09:25Z",
            "2025-06-07 20:09 UTC",
            "20250607T200925",
            "20251307T200925Z",
            "",
        ] {
            assert!(Timestamp::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn string_order_matches_time_order() {
        let earlier = Timestamp::from_datetime(Utc.with_ymd_and_hms(2025, 6, 7, 9, 59, 59).unwrap());
        let later = Timestamp::from_datetime(Utc.with_ymd_and_hms(2025, 6, 7, 10, 0, 0).unwrap());
        assert!(earlier < later);
        assert!(earlier.as_str() < later.as_str());
    }

    #[test]
    fn serde_rejects_malformed_value() {
        let ok: Timestamp = serde_json::from_str("\"20250101T000000Z\"").unwrap();
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"20250101T000000Z\"");
        assert!(serde_json::from_str::<Timestamp>("\"2025-01-01\"").is_err());
    }
}
