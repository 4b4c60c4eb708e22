//! Lenient decoders for values the storage collaborator writes loosely
//! (numeric ids, epoch-millisecond timestamps).

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Text(String),
    Int(i64),
    Float(f64),
}

impl Loose {
    fn into_string(self) -> String {
        match self {
            Loose::Text(text) => text,
            Loose::Int(value) => value.to_string(),
            Loose::Float(value) => value.to_string(),
        }
    }
}

pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Loose::deserialize(deserializer).map(Loose::into_string)
}

pub fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Loose>::deserialize(deserializer).map(|value| value.map(Loose::into_string))
}

/// Timestamps travel as epoch milliseconds; RFC 3339 strings are also accepted.
pub mod epoch_millis {
    use super::*;

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.timestamp_millis())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Loose::deserialize(deserializer)? {
            Loose::Int(millis) => from_millis(millis).ok_or_else(|| D::Error::custom("timestamp out of range")),
            Loose::Float(millis) => {
                from_millis(millis as i64).ok_or_else(|| D::Error::custom("timestamp out of range"))
            }
            Loose::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|value| value.with_timezone(&Utc))
                .map_err(D::Error::custom),
        }
    }

    fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(millis).single()
    }
}
