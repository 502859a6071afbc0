//! Helpers for the loosely typed corners of IIIF JSON.
//!
//! Presentation documents mix `id`/`@id`, single objects and arrays, and plain
//! strings for the same field depending on version and publisher. Everything
//! here tolerates all of those shapes and returns `None`/empty on anything else.

use serde_json::Value;

/// Returns the `id` (v3) or `@id` (v2) of an object, if it is a non-empty string.
pub(crate) fn string_id(value: &Value) -> Option<&str> {
    value
        .get("id")
        .and_then(Value::as_str)
        .or_else(|| value.get("@id").and_then(Value::as_str))
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// Iterates an object-or-array field as a sequence of entries.
pub(crate) fn entries(value: &Value) -> impl Iterator<Item = &Value> {
    let slice: &[Value] = match value {
        Value::Array(items) => items.as_slice(),
        Value::Null => &[],
        other => std::slice::from_ref(other),
    };
    slice.iter()
}

/// First entry of an object-or-array field.
pub(crate) fn first_entry(value: &Value) -> Option<&Value> {
    entries(value).next()
}

/// Collects link targets from a field that may be a string, an object with an
/// id, or an array of either.
pub(crate) fn link_ids(value: Option<&Value>) -> Vec<String> {
    let Some(value) = value else {
        return Vec::new();
    };
    entries(value)
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.trim()).filter(|s| !s.is_empty()),
            Value::Object(_) => string_id(entry),
            _ => None,
        })
        .map(ToOwned::to_owned)
        .collect()
}

/// Reads a positive pixel dimension. Accepts integers, floats and numeric strings.
pub(crate) fn dimension(value: &Value, key: &str) -> Option<u32> {
    let raw = value.get(key)?;
    let parsed = match raw {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(parsed).ok().filter(|d| *d > 0)
}

/// Returns the `type` (v3) or `@type` (v2) of an object.
pub(crate) fn type_name(value: &Value) -> Option<&str> {
    value
        .get("type")
        .and_then(Value::as_str)
        .or_else(|| value.get("@type").and_then(Value::as_str))
}
