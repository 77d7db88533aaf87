use std::{fmt::Display, str::FromStr};

use tracing::warn;

/// Current wall-clock time as fractional seconds since the Unix epoch.
///
/// Event payloads carry `ts` in the same unit, so grace computations can mix
/// both without conversion.
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Parse an optional raw environment value.
///
/// Unset variables yield `None`. Values that fail to parse are logged and
/// also yield `None`, so the caller keeps its default.
pub fn parse_override<T>(name: &str, raw: Option<String>) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = raw?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("ignoring invalid value for {name} ({raw:?}): {e}");
            None
        }
    }
}

/// Serde helpers that coerce loosely-typed JSON fields instead of failing.
///
/// Producers are not under our control, so a field holding `"80"` or `true`
/// is coerced and anything unusable is treated as absent.
pub mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(coerce_number))
    }

    pub fn integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(|value| match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            other => coerce_number(other).map(|f| f as i64),
        }))
    }

    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.and_then(|value| match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }))
    }

    /// Numbers pass through, numeric strings are parsed, booleans become 0/1.
    /// Non-finite results count as missing.
    pub fn coerce_number(value: &Value) -> Option<f64> {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        };
        number.filter(|n| n.is_finite())
    }
}
