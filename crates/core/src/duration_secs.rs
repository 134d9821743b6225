//! `serde(with = "duration_secs")` helper: represents a [`Duration`] on the
//! wire as a plain number of seconds, matching the teacher's
//! `recovery_timeout_seconds: u64`-style config fields (see
//! `crates/server/src/config/circuit_breaker.rs`) but keeping the Rust-side
//! field typed as `Duration` so call sites never convert at the point of use.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    value.as_secs_f64().serialize(serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    Ok(Duration::from_secs_f64(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Wrapper {
        #[serde(with = "crate::duration_secs")]
        d: Duration,
    }

    #[test]
    fn round_trips_through_seconds() {
        let w = Wrapper { d: Duration::from_millis(1500) };
        let toml_str = toml::to_string(&w).unwrap();
        assert!(toml_str.contains("1.5"));
        let back: Wrapper = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.d, w.d);
    }
}
