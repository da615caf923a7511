//! Serde helpers for the store's inconsistent timestamp typing.
//!
//! Responsibilities:
//! - Accept `LastModifiedDate` either as epoch seconds (raw API JSON, possibly fractional)
//!   or as an RFC 3339 string (what the `aws` command-line tool prints).
//!
//! Invariants / assumptions:
//! - Timestamps are always serialized back out as RFC 3339 strings.

use chrono::{DateTime, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EpochOrString {
    Epoch(f64),
    String(String),
}

pub fn opt_timestamp_from_epoch_or_string<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<EpochOrString>::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(EpochOrString::Epoch(secs)) => {
            let whole = secs.trunc() as i64;
            let nanos = ((secs - secs.trunc()) * 1_000_000_000.0).round() as u32;
            Utc.timestamp_opt(whole, nanos)
                .single()
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {secs}")))
        }
        Some(EpochOrString::String(s)) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(D::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "opt_timestamp_from_epoch_or_string")]
        ts: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_epoch_seconds_are_accepted() {
        let h: Holder = serde_json::from_str(r#"{"ts": 1700000000.5}"#).unwrap();
        let ts = h.ts.unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_rfc3339_strings_are_accepted() {
        let h: Holder =
            serde_json::from_str(r#"{"ts": "2024-03-01T12:00:00.123000+00:00"}"#).unwrap();
        assert_eq!(h.ts.unwrap().year(), 2024);
    }

    #[test]
    fn test_missing_and_null_are_none() {
        let h: Holder = serde_json::from_str(r#"{}"#).unwrap();
        assert!(h.ts.is_none());
        let h: Holder = serde_json::from_str(r#"{"ts": null}"#).unwrap();
        assert!(h.ts.is_none());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(serde_json::from_str::<Holder>(r#"{"ts": "yesterday"}"#).is_err());
    }
}
