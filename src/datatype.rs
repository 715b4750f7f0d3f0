//! Datatype registry (C2): maps CSVW built-in datatype names to their
//! canonical IRIs and exposes a small subtype lattice for compatibility
//! checks.
//!
//! Grounded on the teacher's `ColumnType::{from_str,as_str}` round-trip
//! table in `schema.rs`, generalized from a closed enum of a handful of
//! column types to the full CSVW built-in datatype name set.

/// `(name, iri)` pairs for every built-in datatype name CSVW recognizes.
/// Names not in this table are treated as `string` unless the caller
/// passed an absolute IRI directly (`spec.md` §4.1 rule 7).
const BUILTINS: &[(&str, &str)] = &[
    ("number", "http://www.w3.org/2001/XMLSchema#double"),
    ("binary", "http://www.w3.org/2001/XMLSchema#base64Binary"),
    ("datetime", "http://www.w3.org/2001/XMLSchema#dateTime"),
    ("any", "http://www.w3.org/ns/csvw#JSON"),
    ("xml", "http://www.w3.org/1999/02/22-rdf-syntax-ns#XMLLiteral"),
    ("html", "http://www.w3.org/1999/02/22-rdf-syntax-ns#HTML"),
    ("json", "http://www.w3.org/ns/csvw#JSON"),
    ("anyAtomicType", "http://www.w3.org/2001/XMLSchema#anyAtomicType"),
    ("anyURI", "http://www.w3.org/2001/XMLSchema#anyURI"),
    ("base64Binary", "http://www.w3.org/2001/XMLSchema#base64Binary"),
    ("boolean", "http://www.w3.org/2001/XMLSchema#boolean"),
    ("date", "http://www.w3.org/2001/XMLSchema#date"),
    ("dateTime", "http://www.w3.org/2001/XMLSchema#dateTime"),
    ("dateTimeStamp", "http://www.w3.org/2001/XMLSchema#dateTimeStamp"),
    ("decimal", "http://www.w3.org/2001/XMLSchema#decimal"),
    ("integer", "http://www.w3.org/2001/XMLSchema#integer"),
    ("long", "http://www.w3.org/2001/XMLSchema#long"),
    ("int", "http://www.w3.org/2001/XMLSchema#int"),
    ("short", "http://www.w3.org/2001/XMLSchema#short"),
    ("byte", "http://www.w3.org/2001/XMLSchema#byte"),
    ("nonNegativeInteger", "http://www.w3.org/2001/XMLSchema#nonNegativeInteger"),
    ("positiveInteger", "http://www.w3.org/2001/XMLSchema#positiveInteger"),
    ("unsignedLong", "http://www.w3.org/2001/XMLSchema#unsignedLong"),
    ("unsignedInt", "http://www.w3.org/2001/XMLSchema#unsignedInt"),
    ("unsignedShort", "http://www.w3.org/2001/XMLSchema#unsignedShort"),
    ("unsignedByte", "http://www.w3.org/2001/XMLSchema#unsignedByte"),
    ("nonPositiveInteger", "http://www.w3.org/2001/XMLSchema#nonPositiveInteger"),
    ("negativeInteger", "http://www.w3.org/2001/XMLSchema#negativeInteger"),
    ("double", "http://www.w3.org/2001/XMLSchema#double"),
    ("float", "http://www.w3.org/2001/XMLSchema#float"),
    ("duration", "http://www.w3.org/2001/XMLSchema#duration"),
    ("dayTimeDuration", "http://www.w3.org/2001/XMLSchema#dayTimeDuration"),
    ("yearMonthDuration", "http://www.w3.org/2001/XMLSchema#yearMonthDuration"),
    ("gDay", "http://www.w3.org/2001/XMLSchema#gDay"),
    ("gMonth", "http://www.w3.org/2001/XMLSchema#gMonth"),
    ("gMonthDay", "http://www.w3.org/2001/XMLSchema#gMonthDay"),
    ("gYear", "http://www.w3.org/2001/XMLSchema#gYear"),
    ("gYearMonth", "http://www.w3.org/2001/XMLSchema#gYearMonth"),
    ("hexBinary", "http://www.w3.org/2001/XMLSchema#hexBinary"),
    ("QName", "http://www.w3.org/2001/XMLSchema#QName"),
    ("string", "http://www.w3.org/2001/XMLSchema#string"),
    ("normalizedString", "http://www.w3.org/2001/XMLSchema#normalizedString"),
    ("token", "http://www.w3.org/2001/XMLSchema#token"),
    ("language", "http://www.w3.org/2001/XMLSchema#language"),
    ("Name", "http://www.w3.org/2001/XMLSchema#Name"),
    ("NMTOKEN", "http://www.w3.org/2001/XMLSchema#NMTOKEN"),
    ("NCName", "http://www.w3.org/2001/XMLSchema#NCName"),
    ("time", "http://www.w3.org/2001/XMLSchema#time"),
];

/// Built-in names with no CSVW-defined processing semantics
/// (`spec.md` §4.4 "Unsupported XSD names"); cells using these always
/// record a `"unsupported datatype"` error.
pub const UNSUPPORTED_BUILTINS: &[&str] = &[
    "anyType",
    "anySimpleType",
    "ENTITIES",
    "IDREFS",
    "NMTOKENS",
    "ENTITY",
    "ID",
    "IDREF",
    "NOTATION",
];

/// The broad family a datatype base belongs to, used to dispatch cell
/// parsing (`spec.md` §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatatypeFamily {
    Numeric,
    Boolean,
    Date,
    DateTime,
    Time,
    Duration,
    Unsupported,
    Other,
}

/// Looks up the canonical IRI for a built-in datatype name. Returns
/// `None` if `name` is not a recognized built-in (the caller should then
/// treat `name` itself as an absolute IRI, or fall back to `string`).
pub fn builtin_iri(name: &str) -> Option<&'static str> {
    BUILTINS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, iri)| *iri)
}

/// True if `name` is a recognized CSVW built-in datatype name.
pub fn is_builtin(name: &str) -> bool {
    builtin_iri(name).is_some()
}

/// Datatype bases exempt from the CR/TAB/BEL-to-space and
/// whitespace-collapse pre-normalization steps (`spec.md` §4.4 step 1).
pub fn is_preserve_whitespace_base(base: &str) -> bool {
    matches!(
        base,
        "string" | "json" | "xml" | "html" | "anyAtomicType" | "any"
    )
}

/// As [`is_preserve_whitespace_base`], but additionally exempting
/// `normalizedString` from whitespace collapsing.
pub fn is_skip_collapse_base(base: &str) -> bool {
    is_preserve_whitespace_base(base) || base == "normalizedString"
}

pub fn family_of(base: &str) -> DatatypeFamily {
    if UNSUPPORTED_BUILTINS.contains(&base) {
        return DatatypeFamily::Unsupported;
    }
    match base {
        "decimal" | "integer" | "long" | "int" | "short" | "byte" | "nonNegativeInteger"
        | "positiveInteger" | "unsignedLong" | "unsignedInt" | "unsignedShort"
        | "unsignedByte" | "nonPositiveInteger" | "negativeInteger" | "double" | "float"
        | "number" => DatatypeFamily::Numeric,
        "boolean" => DatatypeFamily::Boolean,
        "date" | "gDay" | "gMonth" | "gMonthDay" | "gYear" | "gYearMonth" => DatatypeFamily::Date,
        "dateTime" | "dateTimeStamp" => DatatypeFamily::DateTime,
        "time" => DatatypeFamily::Time,
        "duration" | "dayTimeDuration" | "yearMonthDuration" => DatatypeFamily::Duration,
        _ => DatatypeFamily::Other,
    }
}

/// True if `sub` is the same built-in name as `base`, or `base` is one of
/// the XSD ancestors of `sub` in the numeric/string facet lattice
/// (enough of a partial order to support `spec.md` §4.1's datatype-facet
/// checks; CSVW itself does not require full OWL subsumption).
pub fn is_subtype_of(sub: &str, base: &str) -> bool {
    if sub == base {
        return true;
    }
    let chain: &[&str] = match sub {
        "positiveInteger" => &["nonNegativeInteger", "integer", "decimal"],
        "unsignedByte" => &["unsignedShort", "unsignedInt", "unsignedLong", "nonNegativeInteger", "integer", "decimal"],
        "unsignedShort" => &["unsignedInt", "unsignedLong", "nonNegativeInteger", "integer", "decimal"],
        "unsignedInt" => &["unsignedLong", "nonNegativeInteger", "integer", "decimal"],
        "unsignedLong" => &["nonNegativeInteger", "integer", "decimal"],
        "nonNegativeInteger" => &["integer", "decimal"],
        "negativeInteger" => &["nonPositiveInteger", "integer", "decimal"],
        "nonPositiveInteger" => &["integer", "decimal"],
        "byte" => &["short", "int", "long", "integer", "decimal"],
        "short" => &["int", "long", "integer", "decimal"],
        "int" => &["long", "integer", "decimal"],
        "long" => &["integer", "decimal"],
        "integer" => &["decimal"],
        "dateTimeStamp" => &["dateTime"],
        "dayTimeDuration" => &["duration"],
        "yearMonthDuration" => &["duration"],
        "token" => &["normalizedString", "string"],
        "language" | "Name" | "NMTOKEN" | "NCName" => &["token", "normalizedString", "string"],
        "normalizedString" => &["string"],
        _ => &[],
    };
    chain.contains(&base)
}

/// True if bounds facets (`minimum`/`maximum`/etc.) apply to this base —
/// numeric and date/time families are ordered, `string`/`boolean`/etc.
/// are not (`spec.md` §3's Datatype invariant).
pub fn is_ordered_base(base: &str) -> bool {
    matches!(
        family_of(base),
        DatatypeFamily::Numeric | DatatypeFamily::Date | DatatypeFamily::DateTime | DatatypeFamily::Time
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_iri_resolves_known_names() {
        assert_eq!(builtin_iri("integer"), Some("http://www.w3.org/2001/XMLSchema#integer"));
        assert_eq!(builtin_iri("json"), Some("http://www.w3.org/ns/csvw#JSON"));
    }

    #[test]
    fn builtin_iri_is_none_for_absolute_iri_input() {
        assert_eq!(builtin_iri("http://example.org/custom"), None);
    }

    #[test]
    fn family_of_classifies_numeric_and_unsupported() {
        assert_eq!(family_of("positiveInteger"), DatatypeFamily::Numeric);
        assert_eq!(family_of("ENTITY"), DatatypeFamily::Unsupported);
        assert_eq!(family_of("string"), DatatypeFamily::Other);
    }

    #[test]
    fn is_subtype_of_walks_numeric_lattice() {
        assert!(is_subtype_of("positiveInteger", "integer"));
        assert!(is_subtype_of("positiveInteger", "decimal"));
        assert!(!is_subtype_of("decimal", "integer"));
    }

    #[test]
    fn is_ordered_base_excludes_string_and_boolean() {
        assert!(is_ordered_base("integer"));
        assert!(is_ordered_base("date"));
        assert!(!is_ordered_base("string"));
        assert!(!is_ordered_base("boolean"));
    }

    #[test]
    fn preserve_whitespace_bases_match_spec_list() {
        assert!(is_preserve_whitespace_base("json"));
        assert!(!is_preserve_whitespace_base("normalizedString"));
        assert!(is_skip_collapse_base("normalizedString"));
    }
}
