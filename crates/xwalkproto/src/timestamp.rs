//! Timestamp serde helpers.
//!
//! Timestamps are written as RFC3339 in UTC. On read we also take naive
//! ISO-8601 date-times (treated as UTC) and numeric unix seconds, which is
//! what older station firmware sends.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Seconds(f64),
}

/// Parse a timestamp string: RFC3339 first, then naive date-time as UTC.
pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn from_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

fn from_raw<E: serde::de::Error>(raw: RawTimestamp) -> Result<DateTime<Utc>, E> {
    match raw {
        RawTimestamp::Text(s) => {
            parse(&s).ok_or_else(|| E::custom(format!("invalid timestamp: {s}")))
        }
        RawTimestamp::Seconds(secs) => {
            from_seconds(secs).ok_or_else(|| E::custom(format!("invalid timestamp: {secs}")))
        }
    }
}

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    from_raw(RawTimestamp::deserialize(deserializer)?)
}

/// Same as the parent module, for `Option<DateTime<Utc>>` fields.
pub mod option {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_some(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<RawTimestamp>::deserialize(deserializer)? {
            Some(raw) => from_raw(raw).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_rfc3339_with_offset() {
        let ts = parse("2025-07-01T11:00:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-07-01T09:00:00+00:00");
    }

    #[test]
    fn parses_naive_as_utc() {
        let ts = parse("2025-07-01T09:00:00.250").unwrap();
        assert_eq!(ts.hour(), 9);
        assert_eq!(ts.timestamp_subsec_millis(), 250);

        assert!(parse("2025-07-01 09:00:00").is_some());
        assert!(parse("yesterday").is_none());
    }

    #[test]
    fn numeric_seconds() {
        let ts = from_seconds(1_700_000_000.5).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
        assert!(from_seconds(f64::NAN).is_none());
    }
}
