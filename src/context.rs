//! Value context (C1): BCP47 language-tag validation and IRI
//! expansion/compaction relative to a JSON-LD-style `@context`.
//!
//! The context is immutable after parsing except for `base`, which is
//! rebased per table (`spec.md` §3).

use std::collections::BTreeMap;
use std::str::FromStr;

use unic_langid::LanguageIdentifier;
use url::Url;

pub const CSVW_NAMESPACE: &str = "http://www.w3.org/ns/csvw";

/// The default language tag CSVW assigns when none is specified.
pub const UNDETERMINED_LANGUAGE: &str = "und";

#[derive(Debug, Clone)]
pub struct Context {
    pub base: Option<Url>,
    pub default_language: String,
    pub prefixes: BTreeMap<String, String>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            base: None,
            default_language: UNDETERMINED_LANGUAGE.to_string(),
            prefixes: BTreeMap::new(),
        }
    }
}

impl Context {
    pub fn with_base(base: Url) -> Self {
        Self {
            base: Some(base),
            ..Self::default()
        }
    }

    /// Parses a `@context` value, which per `spec.md` §6 may be the bare
    /// namespace string, an object `{"@base":..., "@language":...}`, or an
    /// array whose members include the namespace string and/or such an
    /// object.
    pub fn from_json(value: &serde_json::Value, base: Option<Url>) -> Self {
        let mut context = Self {
            base,
            ..Self::default()
        };

        let entries: Vec<&serde_json::Value> = match value {
            serde_json::Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        for entry in entries {
            if let serde_json::Value::Object(map) = entry {
                if let Some(base_str) = map.get("@base").and_then(|v| v.as_str())
                    && let Some(resolved) = context.resolve_base(base_str)
                {
                    context.base = Some(resolved);
                }
                if let Some(lang) = map.get("@language").and_then(|v| v.as_str())
                    && is_valid_bcp47(lang)
                {
                    context.default_language = lang.to_string();
                }
            }
        }

        context
    }

    fn resolve_base(&self, candidate: &str) -> Option<Url> {
        match &self.base {
            Some(existing) => existing.join(candidate).ok(),
            None => Url::parse(candidate).ok(),
        }
    }

    /// Rebases this context for a specific table, resolving `table_url`
    /// against the current base (or treating it as absolute if there is
    /// none yet).
    pub fn rebase(&self, table_url: &str) -> Context {
        let base = match &self.base {
            Some(base) => base.join(table_url).ok(),
            None => Url::parse(table_url).ok(),
        };
        Context {
            base,
            default_language: self.default_language.clone(),
            prefixes: self.prefixes.clone(),
        }
    }

    /// Expands a possibly-relative IRI string against `base`. CURIE-style
    /// `prefix:suffix` references are expanded using `prefixes` first.
    pub fn expand_iri(&self, value: &str) -> String {
        if let Some((prefix, suffix)) = value.split_once(':')
            && let Some(namespace) = self.prefixes.get(prefix)
        {
            return format!("{namespace}{suffix}");
        }
        match &self.base {
            Some(base) => base
                .join(value)
                .map(|url| url.to_string())
                .unwrap_or_else(|_| value.to_string()),
            None => value.to_string(),
        }
    }

    /// Compacts an absolute IRI back to a CURIE if a matching prefix exists.
    pub fn compact_iri<'a>(&self, iri: &'a str) -> std::borrow::Cow<'a, str> {
        for (prefix, namespace) in &self.prefixes {
            if let Some(suffix) = iri.strip_prefix(namespace.as_str()) {
                return std::borrow::Cow::Owned(format!("{prefix}:{suffix}"));
            }
        }
        std::borrow::Cow::Borrowed(iri)
    }
}

/// Validates a BCP47 language tag. `und` and the CSVW wildcard `*` are
/// always accepted. Case folding is ASCII-only (see `DESIGN.md` Open
/// Question 3).
pub fn is_valid_bcp47(tag: &str) -> bool {
    if tag == "*" || tag.eq_ignore_ascii_case(UNDETERMINED_LANGUAGE) {
        return true;
    }
    LanguageIdentifier::from_str(tag).is_ok()
}

/// Folds a language tag for `und`-vs-other-language de-duplication
/// comparisons (`spec.md` §4.1 merge rules, §9 Open Question 3).
pub fn fold_language_tag(tag: &str) -> String {
    tag.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_valid_bcp47_accepts_common_tags() {
        assert!(is_valid_bcp47("en"));
        assert!(is_valid_bcp47("en-US"));
        assert!(is_valid_bcp47("fr-CA"));
        assert!(is_valid_bcp47("und"));
        assert!(is_valid_bcp47("*"));
    }

    #[test]
    fn is_valid_bcp47_rejects_malformed_tags() {
        assert!(!is_valid_bcp47("!!!"));
        assert!(!is_valid_bcp47(""));
    }

    #[test]
    fn context_from_bare_namespace_string_uses_defaults() {
        let value = serde_json::Value::String(CSVW_NAMESPACE.to_string());
        let context = Context::from_json(&value, None);
        assert_eq!(context.default_language, UNDETERMINED_LANGUAGE);
        assert!(context.base.is_none());
    }

    #[test]
    fn context_from_array_with_language_object() {
        let value = serde_json::json!([CSVW_NAMESPACE, {"@language": "fr"}]);
        let context = Context::from_json(&value, None);
        assert_eq!(context.default_language, "fr");
    }

    #[test]
    fn rebase_resolves_table_url_against_existing_base() {
        let context = Context::with_base(Url::parse("http://example.org/data/").unwrap());
        let rebased = context.rebase("t.csv");
        assert_eq!(rebased.base.unwrap().as_str(), "http://example.org/data/t.csv");
    }

    #[test]
    fn expand_iri_resolves_relative_references() {
        let context = Context::with_base(Url::parse("http://example.org/data/").unwrap());
        assert_eq!(
            context.expand_iri("other.csv"),
            "http://example.org/data/other.csv"
        );
    }

    #[test]
    fn fold_language_tag_is_case_insensitive() {
        assert_eq!(fold_language_tag("EN-us"), fold_language_tag("en-US"));
    }
}
