//! Scalar coercion utilities
//!
//! Total conversions from arbitrary JSON values to typed scalars. None of these
//! functions can fail: anything that does not parse yields the caller's default.

use serde_json::{Map, Value};

/// Parse a JSON value as a finite number.
///
/// Numbers and numeric strings (surrounding whitespace allowed) are accepted.
/// Booleans, containers, null, NaN and infinities are not.
fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Coerce a value to an integer, truncating any fractional part.
pub fn coerce_int(value: Option<&Value>, default: i64) -> i64 {
    match value {
        Some(Value::Number(n)) if n.is_i64() => n.as_i64().unwrap_or(default),
        Some(v) => parse_number(v).map(|f| f.trunc() as i64).unwrap_or(default),
        None => default,
    }
}

/// Coerce a value to a float.
///
/// An absent or null value returns `default` as-is, so passing `None` lets the
/// caller tell "no value" apart from `0.0`.
pub fn coerce_float(value: Option<&Value>, default: Option<f64>) -> Option<f64> {
    match value {
        None | Some(Value::Null) => default,
        Some(v) => parse_number(v).or(default),
    }
}

/// Coerce a value to a boolean.
pub fn coerce_bool(value: Option<&Value>, default: bool) -> bool {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => true,
            "false" | "no" | "n" | "0" | "" => false,
            _ => true,
        },
        Some(other) => is_truthy(other),
    }
}

/// Loose truthiness: null, false, zero and empty strings/containers are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// First truthy value among `keys`, in order.
pub fn first_truthy<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| is_truthy(value))
}

/// First non-null value among `keys`, in order.
pub fn first_present<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find(|value| !value.is_null())
}

/// Render a value as a plain string (strings unquoted, everything else as JSON).
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Nested mapping under `key`, if that key holds an object.
pub fn get_object<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    record.get(key).and_then(Value::as_object)
}

/// Sequence under `key`, if that key holds an array.
pub fn get_array<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a Vec<Value>> {
    record.get(key).and_then(Value::as_array)
}
