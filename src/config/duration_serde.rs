//! Serde helpers for human-readable durations in configuration.
//!
//! Accepts either a number of seconds or a humantime string such as `"15s"`,
//! `"2h"` or `"3days"`, and always writes the humantime form back out.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::{fmt, time::Duration};

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let duration_str = humantime::format_duration(*duration).to_string();
    serializer.serialize_str(&duration_str)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct DurationVisitor;

    impl Visitor<'_> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a duration as seconds (number) or human-readable string (e.g., '15s', '2h', '3days')")
        }

        fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(seconds))
        }

        fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(seconds)
                .map(Duration::from_secs)
                .map_err(|_| de::Error::custom(format!("Negative duration: {seconds}")))
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(value)
                .map_err(|e| de::Error::custom(format!("Invalid duration '{value}': {e}")))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}

/// Parse one of the compiled-in default duration strings
pub(crate) fn parse_default(value: &str) -> Duration {
    humantime::parse_duration(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Wrapper {
        #[serde(with = "super")]
        ttl: Duration,
    }

    #[test]
    fn test_parse_human_readable() {
        let parsed: Wrapper = serde_json::from_str(r#"{"ttl": "2h"}"#).unwrap();
        assert_eq!(parsed.ttl, Duration::from_secs(7200));

        let parsed: Wrapper = serde_json::from_str(r#"{"ttl": "3days"}"#).unwrap();
        assert_eq!(parsed.ttl, Duration::from_secs(3 * 86_400));
    }

    #[test]
    fn test_parse_seconds() {
        let parsed: Wrapper = serde_json::from_str(r#"{"ttl": 300}"#).unwrap();
        assert_eq!(parsed.ttl, Duration::from_secs(300));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_str::<Wrapper>(r#"{"ttl": "soon"}"#).is_err());
        assert!(serde_json::from_str::<Wrapper>(r#"{"ttl": -5}"#).is_err());
    }

    #[test]
    fn test_serialize_round_trips_through_humantime() {
        let text = serde_json::to_string(&Wrapper {
            ttl: Duration::from_secs(300),
        })
        .unwrap();
        assert_eq!(text, r#"{"ttl":"5m"}"#);
    }
}
