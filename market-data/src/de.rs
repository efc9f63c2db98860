//! Serde helpers for provider payloads that encode numbers as strings or `null`.

use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// Deserialize a `String` as the desired type.
pub fn de_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let data: String = Deserialize::deserialize(deserializer)?;
    data.parse::<T>().map_err(serde::de::Error::custom)
}

/// Deserialize an optional numeric string as an `f64`, treating `null` and blank as `0.0`.
pub fn de_opt_str_f64_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value {
        Some(raw) if raw.trim().is_empty() => Ok(0.0),
        Some(raw) => raw.trim().parse::<f64>().map_err(serde::de::Error::custom),
        None => Ok(0.0),
    }
}

/// Deserialize an optional JSON number as an `f64`, treating `null` as `0.0`.
pub fn de_opt_f64_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(|value| value.unwrap_or(0.0))
}
