//! WebAssembly bindings for Auto Containers
//!
//! The options page and popup call into these for sorting, validation and
//! matching so the UI and the router share one implementation.

use ac_core::{Rule, TldList};
use ac_rules::{rules_from_text, sort_rules_with_stats, SortKey, ValidationError};
use wasm_bindgen::prelude::*;

fn set(target: &js_sys::Object, key: &str, value: &JsValue) {
    let _ = js_sys::Reflect::set(target, &key.into(), value);
}

fn error_object(e: &ValidationError) -> js_sys::Object {
    let obj = js_sys::Object::new();
    set(&obj, "lineNumber", &JsValue::from(e.line_number as u32));
    set(&obj, "line", &JsValue::from_str(&e.line));
    set(&obj, "message", &JsValue::from_str(&e.to_string()));
    obj
}

/// Kind name exposed to JS for a sort key.
fn key_kind(key: &SortKey) -> &'static str {
    match key {
        SortKey::Domain(_) => "domain",
        SortKey::GlobalTld(_) => "globalTld",
        SortKey::CatchAll => "catchAll",
    }
}

/// Container named by the first rule of `rules_text` matching `url`.
fn container_for(rules_text: &str, url: &str) -> Option<String> {
    let rules: Vec<Rule> = rules_from_text(rules_text);
    ac_core::first_match(&rules, url).map(|(_, rule)| rule.container.clone())
}

// =============================================================================
// Exports
// =============================================================================

/// Sort a rules text into priority order. Invalid lines are dropped and
/// reported on the console.
#[wasm_bindgen]
pub fn sort_rules(text: &str) -> String {
    let (sorted, stats) = sort_rules_with_stats(text, &TldList::default());
    if stats.rejected > 0 {
        web_sys::console::warn_1(&JsValue::from_str(&format!(
            "Dropped {} invalid rule line(s) while sorting",
            stats.rejected
        )));
    }
    sorted
}

/// Validate a rules text. Returns `{ valid, error? }` where `error` carries
/// `lineNumber`, `line` and `message` of the first defect.
#[wasm_bindgen]
pub fn validate_rules(text: &str) -> JsValue {
    let result = js_sys::Object::new();
    match ac_rules::validate_rules(text) {
        Ok(count) => {
            set(&result, "valid", &JsValue::TRUE);
            set(&result, "rules", &JsValue::from(count as u32));
        }
        Err(e) => {
            set(&result, "valid", &JsValue::FALSE);
            set(&result, "error", &error_object(&e));
        }
    }
    result.into()
}

/// Every defect of a rules text, in line order.
#[wasm_bindgen]
pub fn rule_errors(text: &str) -> js_sys::Array {
    ac_rules::validate_all(text)
        .iter()
        .map(|e| JsValue::from(error_object(e)))
        .collect()
}

#[wasm_bindgen]
pub fn is_valid_pattern(pattern: &str) -> bool {
    ac_rules::is_valid_pattern(pattern)
}

#[wasm_bindgen]
pub fn is_valid_container_name(name: &str) -> bool {
    ac_rules::is_valid_container_name(name)
}

/// Whether `url` matches a single rule pattern.
#[wasm_bindgen]
pub fn matches(url: &str, pattern: &str) -> bool {
    ac_core::matches(url, pattern)
}

/// Container name of the first rule matching `url`, or undefined.
#[wasm_bindgen]
pub fn find_container(rules_text: &str, url: &str) -> Option<String> {
    container_for(rules_text, url)
}

/// Sort key of a pattern as `{ kind, label }`.
#[wasm_bindgen]
pub fn sort_key(pattern: &str) -> JsValue {
    let key = ac_rules::sort_key(pattern, &TldList::default());
    let result = js_sys::Object::new();
    set(&result, "kind", &JsValue::from_str(key_kind(&key)));
    set(&result, "label", &JsValue::from_str(key.label()));
    result.into()
}

/// Whether `general` matches everything `specific` matches.
#[wasm_bindgen]
pub fn pattern_covers(general: &str, specific: &str) -> bool {
    ac_rules::pattern_covers(general, specific)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_kind() {
        let tlds = TldList::default();
        assert_eq!(key_kind(&ac_rules::sort_key("mail.google.com", &tlds)), "domain");
        assert_eq!(key_kind(&ac_rules::sort_key("*.com", &tlds)), "globalTld");
        assert_eq!(key_kind(&ac_rules::sort_key("*", &tlds)), "catchAll");
    }

    #[test]
    fn test_container_for() {
        let rules = "youtube.com, YT\n*, Default";
        assert_eq!(container_for(rules, "https://www.youtube.com/").as_deref(), Some("YT"));
        assert_eq!(container_for(rules, "https://example.org/").as_deref(), Some("Default"));
        assert_eq!(container_for("youtube.com, YT", "about:blank"), None);
    }
}
