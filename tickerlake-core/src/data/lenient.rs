//! Lenient field coercion for provider payloads.
//!
//! Providers disagree on whether a number arrives as a JSON number, a numeric
//! string (`"185.6400"`), `null`, a placeholder such as `"None"`, or not at
//! all. Every optional payload field goes through one of these deserializers,
//! so payload records only ever carry `Some(value)` or `None`. The defaults for
//! `None` are applied once, in the normalizer.
//!
//! Use together with `#[serde(default)]` so that a missing key is `None` too.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Number, numeric string, or absent.
pub fn f64_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

/// Integer, float (truncated), numeric string, or absent.
pub fn i64_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_as_i64))
}

/// String, number rendered as text, or absent. Blank strings count as absent.
pub fn string_opt<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_as_string))
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|x| x.is_finite())
}

pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(float_to_i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_to_i64))
        }
        _ => None,
    }
}

pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn float_to_i64(x: f64) -> Option<i64> {
    if x.is_finite() && x.abs() < i64::MAX as f64 {
        Some(x.trunc() as i64)
    } else {
        None
    }
}
