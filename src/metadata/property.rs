//! Per-property-category validators (`spec.md` §4.1).
//!
//! REDESIGN FLAGS §9: the teacher's source dispatches property setters by
//! string name through reflection; here each of the seven categories owns
//! exactly one validator function, and node classes declare only a
//! static `(name, category)` table (see `metadata::parse::PROPERTY_TABLE`).
//! On invalid input the caller records a warning and either reverts to
//! the property's default or drops the slot — never panics or fails the
//! whole parse (`spec.md` §9 Open Question 1: "no default" means "drop").

use crate::context::{Context, is_valid_bcp47};
use crate::metadata::node::{LanguageMap, NullSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyCategory {
    Link,
    Atomic,
    Array,
    Object,
    NaturalLanguage,
    ColumnReference,
    UriTemplate,
}

/// Resolves a `link` property: a string, resolved to an absolute URL
/// against the context's base on normalization.
pub fn validate_link(value: &serde_json::Value, context: &Context) -> Option<String> {
    let raw = value.as_str()?;
    Some(context.expand_iri(raw))
}

/// Validates a single-character atomic string property (e.g.
/// `delimiter`, `quoteChar`, `commentPrefix`).
pub fn validate_single_char(value: &serde_json::Value) -> Option<char> {
    let raw = value.as_str()?;
    let mut chars = raw.chars();
    let first = chars.next()?;
    if chars.next().is_some() { None } else { Some(first) }
}

/// Validates a non-negative integer atomic property (e.g. `skipRows`).
pub fn validate_non_negative_integer(value: &serde_json::Value) -> Option<usize> {
    match value {
        serde_json::Value::Number(n) => n.as_u64().map(|v| v as usize),
        serde_json::Value::String(s) => s.parse::<usize>().ok(),
        _ => None,
    }
}

/// Validates a boolean atomic property, accepting the JSON boolean or the
/// string forms CSVW tolerates in embedded-dialect contexts.
pub fn validate_boolean(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => match s.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Validates an enum atomic property against a closed set of allowed
/// string tokens.
pub fn validate_enum<'a>(value: &'a serde_json::Value, choices: &[&str]) -> Option<&'a str> {
    let raw = value.as_str()?;
    choices.iter().find(|c| **c == raw).map(|_| raw)
}

/// Validates a BCP47 language-tag atomic property.
pub fn validate_language_tag(value: &serde_json::Value) -> Option<String> {
    let raw = value.as_str()?;
    is_valid_bcp47(raw).then(|| raw.to_string())
}

/// Validates the `null` inherited property: a string, or an array of
/// strings.
pub fn validate_null_spec(value: &serde_json::Value) -> Option<NullSpec> {
    match value {
        serde_json::Value::String(s) => Some(NullSpec::Single(s.clone())),
        serde_json::Value::Array(items) => {
            let strings: Option<Vec<String>> =
                items.iter().map(|v| v.as_str().map(str::to_string)).collect();
            strings.map(NullSpec::Multiple)
        }
        _ => None,
    }
}

/// Validates a `column_reference` property: a string or array of
/// strings, later checked for existence against the enclosing schema by
/// the validation pass (`spec.md` §4.1 rule 5).
pub fn validate_column_reference(value: &serde_json::Value) -> Option<Vec<String>> {
    match value {
        serde_json::Value::String(s) => Some(vec![s.clone()]),
        serde_json::Value::Array(items) => {
            items.iter().map(|v| v.as_str().map(str::to_string)).collect()
        }
        _ => None,
    }
}

/// Validates a `uri_template` property: structurally, a string with
/// balanced `{...}` expressions (full grammar checking happens lazily in
/// [`crate::uri_template::UriTemplate::parse`]).
pub fn validate_uri_template(value: &serde_json::Value) -> Option<String> {
    let raw = value.as_str()?;
    crate::uri_template::UriTemplate::parse(raw).ok()?;
    Some(raw.to_string())
}

/// Normalizes a `natural_language` property to the canonical
/// language-tag→list-of-strings map form (`spec.md` §4.1).
pub fn normalize_natural_language(value: &serde_json::Value, default_language: &str) -> LanguageMap {
    let mut map = LanguageMap::new();
    match value {
        serde_json::Value::String(s) => {
            map.entry(default_language.to_string()).or_default().push(s.clone());
        }
        serde_json::Value::Array(items) => {
            for item in items {
                if let Some(s) = item.as_str() {
                    map.entry(default_language.to_string()).or_default().push(s.to_string());
                }
            }
        }
        serde_json::Value::Object(entries) => {
            for (lang, value) in entries {
                let tag = if is_valid_bcp47(lang) { lang.clone() } else { "und".to_string() };
                match value {
                    serde_json::Value::String(s) => map.entry(tag).or_default().push(s.clone()),
                    serde_json::Value::Array(items) => {
                        for item in items {
                            if let Some(s) = item.as_str() {
                                map.entry(tag.clone()).or_default().push(s.to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
    map
}

/// Drops `und` entries that duplicate a value already present under any
/// other language (`spec.md` §4.1 merge rules; §9 Open Question 3 — the
/// comparison folds ASCII case per [`crate::context::fold_language_tag`]).
pub fn dedupe_und(map: &mut LanguageMap) {
    use crate::context::fold_language_tag;
    use itertools::Itertools;
    let other_values: Vec<String> = map
        .iter()
        .filter(|(lang, _)| fold_language_tag(lang) != "und")
        .flat_map(|(_, values)| values.iter().cloned())
        .unique()
        .collect();
    if let Some(und_values) = map.get_mut("und") {
        und_values.retain(|v| !other_values.contains(v));
    }
    map.retain(|_, values| !values.is_empty());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_single_char_rejects_multi_character_strings() {
        assert_eq!(validate_single_char(&json!(",")), Some(','));
        assert_eq!(validate_single_char(&json!(",,")), None);
    }

    #[test]
    fn validate_non_negative_integer_accepts_number_and_numeric_string() {
        assert_eq!(validate_non_negative_integer(&json!(3)), Some(3));
        assert_eq!(validate_non_negative_integer(&json!("3")), Some(3));
        assert_eq!(validate_non_negative_integer(&json!(-1)), None);
    }

    #[test]
    fn validate_null_spec_accepts_string_and_array() {
        assert_eq!(validate_null_spec(&json!("NA")), Some(NullSpec::Single("NA".to_string())));
        assert_eq!(
            validate_null_spec(&json!(["NA", "-"])),
            Some(NullSpec::Multiple(vec!["NA".to_string(), "-".to_string()]))
        );
    }

    #[test]
    fn normalize_natural_language_wraps_bare_string_under_default_language() {
        let map = normalize_natural_language(&json!("Name"), "en");
        assert_eq!(map.get("en"), Some(&vec!["Name".to_string()]));
    }

    #[test]
    fn normalize_natural_language_falls_back_to_und_for_unknown_tag() {
        let map = normalize_natural_language(&json!({"not-a-tag!!": "x"}), "en");
        assert_eq!(map.get("und"), Some(&vec!["x".to_string()]));
    }

    #[test]
    fn dedupe_und_drops_values_present_under_other_languages() {
        let mut map = LanguageMap::new();
        map.insert("und".to_string(), vec!["Name".to_string(), "Unique".to_string()]);
        map.insert("en".to_string(), vec!["Name".to_string()]);
        dedupe_und(&mut map);
        assert_eq!(map.get("und"), Some(&vec!["Unique".to_string()]));
    }
}
