//! Serde helpers for the clinic backend's JSON. Ids arrive either as numbers
//! or strings depending on the endpoint, and times of day as `HH:MM` or
//! `HH:MM:SS`.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

/// `null` and missing both count as zero.
pub fn zero_if_null<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(0))
}

/// Nullable booleans: `null` and missing fall back to `true`.
pub fn true_if_null<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

pub fn false_if_null<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

pub mod time_of_day {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
    }

    pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|e| D::Error::custom(format!("invalid time of day '{}': {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "id")]
        id: String,
        #[serde(default, deserialize_with = "optional_id")]
        other: Option<String>,
        #[serde(default, deserialize_with = "zero_if_null")]
        count: u32,
        #[serde(with = "time_of_day")]
        at: NaiveTime,
    }

    #[test]
    fn accepts_numeric_and_text_ids() {
        let sample: Sample =
            serde_json::from_str(r#"{"id": 17, "other": "x9", "count": null, "at": "09:30"}"#).unwrap();

        assert_eq!(sample.id, "17");
        assert_eq!(sample.other.as_deref(), Some("x9"));
        assert_eq!(sample.count, 0);
        assert_eq!(sample.at, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    }

    #[test]
    fn accepts_seconds_in_time_of_day() {
        let sample: Sample = serde_json::from_str(r#"{"id": "a", "at": "14:05:00"}"#).unwrap();
        assert_eq!(sample.at, NaiveTime::from_hms_opt(14, 5, 0).unwrap());
        assert!(sample.other.is_none());
    }

    #[derive(Deserialize)]
    struct Flags {
        #[serde(default = "yes", deserialize_with = "true_if_null")]
        open: bool,
        #[serde(default, deserialize_with = "false_if_null")]
        granted: bool,
    }

    fn yes() -> bool {
        true
    }

    #[test]
    fn null_flags_take_their_defaults() {
        let flags: Flags = serde_json::from_str(r#"{"open": null, "granted": null}"#).unwrap();
        assert!(flags.open);
        assert!(!flags.granted);

        let flags: Flags = serde_json::from_str("{}").unwrap();
        assert!(flags.open);
        assert!(!flags.granted);

        let flags: Flags = serde_json::from_str(r#"{"open": false, "granted": true}"#).unwrap();
        assert!(!flags.open);
        assert!(flags.granted);
    }

    #[test]
    fn malformed_time_fails_fast() {
        let result = serde_json::from_str::<Sample>(r#"{"id": "a", "at": "half past nine"}"#);
        assert!(result.is_err());
    }
}
