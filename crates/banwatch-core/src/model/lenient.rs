// Boundary deserializers for loosely typed API payloads.
//
// The upstream API is not strict about types: ids arrive as strings or
// numbers, counters occasionally as floats, and optional objects as `null`.
// These helpers map every such shape to a defined default instead of failing
// the whole payload.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Strings and numbers become `Some(String)`; anything else is `None`
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_as_string))
}

/// Like [`string_or_number`] but absent values become an empty string
pub(crate) fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    string_or_number(deserializer).map(Option::unwrap_or_default)
}

/// Non-negative integer counters; floats are truncated, garbage reads as 0
pub(crate) fn counter<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_u64).unwrap_or(0))
}

/// `null` reads as the type's default
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Boolean flags; `null` and non-boolean values read as `false`
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(matches!(value, Some(Value::Bool(true))))
}

/// Player names arrive as `[{"name": "..."}]`; entries without a name are dropped
pub(crate) fn names<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(mut map) => map.remove("name").and_then(value_as_string),
            Value::String(name) => Some(name),
            _ => None,
        })
        .collect())
}

/// Penalty counters keyed by penalty kind; non-numeric entries are dropped
pub(crate) fn counters<'de, D>(deserializer: D) -> Result<BTreeMap<String, u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(map
        .into_iter()
        .filter_map(|(kind, value)| value_as_u64(&value).map(|count| (kind, count)))
        .collect())
}

fn value_as_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
