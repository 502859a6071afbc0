use carousel_core::extract_label;
use serde_json::json;

fn prefs(langs: &[&str]) -> Vec<String> {
    langs.iter().map(|s| s.to_string()).collect()
}

#[test]
fn language_map_follows_preference_order() {
    let label = json!({ "en": ["English"], "none": ["Untagged"], "ja": ["日本語"] });
    assert_eq!(
        extract_label(&label, &prefs(&["ja", "en", "none"])).as_deref(),
        Some("日本語")
    );
    assert_eq!(
        extract_label(&label, &prefs(&["fr", "en", "none"])).as_deref(),
        Some("English")
    );
}

#[test]
fn empty_language_entries_are_skipped() {
    let label = json!({ "ja": [""], "none": ["Fallback"] });
    assert_eq!(
        extract_label(&label, &prefs(&["ja", "en", "none"])).as_deref(),
        Some("Fallback")
    );
}

#[test]
fn v2_value_object_and_plain_string() {
    let langs = prefs(&["ja", "en", "none"]);
    assert_eq!(
        extract_label(&json!({ "@value": "Value label" }), &langs).as_deref(),
        Some("Value label")
    );
    assert_eq!(extract_label(&json!("  Plain  "), &langs).as_deref(), Some("Plain"));
    assert_eq!(extract_label(&json!(""), &langs), None);
    assert_eq!(extract_label(&json!(12), &langs), None);
}

#[test]
fn v2_language_array_prefers_tagged_value() {
    let label = json!([
        { "@value": "Carte", "@language": "fr" },
        { "@value": "Map", "@language": "en" }
    ]);
    assert_eq!(
        extract_label(&label, &prefs(&["ja", "en", "none"])).as_deref(),
        Some("Map")
    );
    assert_eq!(extract_label(&label, &prefs(&["de"])).as_deref(), Some("Carte"));
}

#[test]
fn unmatched_language_map_has_no_label() {
    let label = json!({ "fr": ["Carte"] });
    assert_eq!(extract_label(&label, &prefs(&["ja", "en", "none"])), None);
}
