use serde_json::Value;

/// Language preference used when no other order is configured.
pub const DEFAULT_LABEL_LANGUAGES: &[&str] = &["ja", "en", "none"];

/// Human-readable label from a v3 language map or a v2 label value.
///
/// `languages` is tried in order against the map keys (v3) or `@language`
/// tags (v2); `none` also matches v2 values without a language tag.
pub fn extract_label(label: &Value, languages: &[String]) -> Option<String> {
    match label {
        Value::String(s) => non_empty(s),
        Value::Object(map) => {
            for lang in languages {
                if let Some(text) = map.get(lang.as_str()).and_then(first_text) {
                    return Some(text);
                }
            }
            map.get("@value").and_then(Value::as_str).and_then(non_empty)
        }
        Value::Array(values) => {
            for lang in languages {
                let found = values
                    .iter()
                    .filter(|v| language_of(v) == lang.as_str())
                    .find_map(value_text);
                if found.is_some() {
                    return found;
                }
            }
            values.iter().find_map(value_text)
        }
        _ => None,
    }
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.iter().find_map(|v| v.as_str().and_then(non_empty)),
        Value::String(s) => non_empty(s),
        _ => None,
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Object(_) => value.get("@value").and_then(Value::as_str).and_then(non_empty),
        _ => None,
    }
}

fn language_of(value: &Value) -> &str {
    value
        .get("@language")
        .and_then(Value::as_str)
        .unwrap_or("none")
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
