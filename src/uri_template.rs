//! RFC 6570 Level 2 URI Template expansion for `aboutUrl`/`propertyUrl`/
//! `valueUrl` (`spec.md` §4.1 "uri_template" property category, §4.4
//! step 6).
//!
//! No crate in the retrieved corpus implements RFC 6570, so this is a
//! small hand-rolled expander in the teacher's manual-mini-parser idiom
//! (see `schema.rs::parse_decimal_type`, which hand-parses a
//! `name(k=v,...)` shape with the same brace-scanning style used below).

use std::collections::BTreeMap;

use crate::error::UriTemplateError;

/// One `{...}` expression segment of a template, or a literal span.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Expression { operator: Option<char>, varname: String, explode: bool },
}

/// A parsed RFC 6570 Level 2 template: literals, simple `{var}`
/// expansion, reserved `{+var}` expansion, fragment `{#var}` expansion,
/// and the `{var*}` explode-list modifier used for multi-valued cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    segments: Vec<Segment>,
}

impl UriTemplate {
    /// Parses and structurally validates `template`. Per `spec.md` §4.1,
    /// this only needs to reject malformed brace nesting; full Level 2
    /// operator support is validated lazily at expansion time.
    pub fn parse(template: &str) -> Result<Self, UriTemplateError> {
        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after_open = &rest[open + 1..];
            let close = after_open.find('}').ok_or_else(|| UriTemplateError::UnterminatedExpression {
                value: template.to_string(),
            })?;
            let expr = &after_open[..close];
            segments.push(parse_expression(expr));
            rest = &after_open[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(Self { segments })
    }

    /// Expands the template against `values`, where a missing key or a
    /// `None` entry expands to the empty string (undefined-variable
    /// expansion per RFC 6570 §3.2.1). List-valued entries require the
    /// `*` explode modifier; without it, only the first item is used.
    pub fn expand(&self, values: &BTreeMap<String, TemplateValue>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Expression { operator, varname, explode } => {
                    let value = values.get(varname);
                    out.push_str(&expand_expression(*operator, value, *explode));
                }
            }
        }
        out
    }
}

/// A template variable's substitution value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    Scalar(String),
    List(Vec<String>),
}

fn parse_expression(expr: &str) -> Segment {
    let (operator, body) = match expr.chars().next() {
        Some(c @ ('+' | '#' | '.' | '/' | ';' | '?' | '&')) => (Some(c), &expr[1..]),
        _ => (None, expr),
    };
    let explode = body.ends_with('*');
    let varname = body.trim_end_matches('*').to_string();
    Segment::Expression { operator, varname, explode }
}

fn expand_expression(operator: Option<char>, value: Option<&TemplateValue>, explode: bool) -> String {
    let items: Vec<String> = match value {
        None => return String::new(),
        Some(TemplateValue::Scalar(s)) => vec![s.clone()],
        Some(TemplateValue::List(items)) => {
            if items.is_empty() {
                return String::new();
            }
            if explode {
                items.clone()
            } else {
                vec![items[0].clone()]
            }
        }
    };

    let reserved = matches!(operator, Some('+') | Some('#'));
    let encoded: Vec<String> = items.iter().map(|item| percent_encode(item, reserved)).collect();

    match operator {
        Some('#') => format!("#{}", encoded.join(",")),
        Some('+') => encoded.join(","),
        Some('.') => encoded.iter().map(|e| format!(".{e}")).collect::<Vec<_>>().join(""),
        Some('/') => encoded.iter().map(|e| format!("/{e}")).collect::<Vec<_>>().join(""),
        Some(';') => encoded.iter().map(|e| format!(";{e}")).collect::<Vec<_>>().join(""),
        Some('?') => {
            let mut out = String::from("?");
            out.push_str(&encoded.join("&"));
            out
        }
        Some('&') => {
            let mut out = String::from("&");
            out.push_str(&encoded.join("&"));
            out
        }
        _ => encoded.join(","),
    }
}

/// Percent-encodes `value` per RFC 6570 §3.2.2: unreserved characters
/// pass through; in "reserved expansion" mode (`+`/`#` operators),
/// reserved characters also pass through unescaped.
fn percent_encode(value: &str, reserved_expansion: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        let ch = byte as char;
        let is_unreserved = ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_' | '~');
        let is_reserved = matches!(
            ch,
            ':' | '/' | '?' | '#' | '[' | ']' | '@' | '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '='
        );
        if is_unreserved || (reserved_expansion && is_reserved) {
            out.push(ch);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(values: &[(&str, &str)]) -> BTreeMap<String, TemplateValue> {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), TemplateValue::Scalar(v.to_string())))
            .collect()
    }

    #[test]
    fn expands_simple_variable_substitution() {
        let template = UriTemplate::parse("http://ex/{_name}").unwrap();
        let values = scalar(&[("_name", "age")]);
        assert_eq!(template.expand(&values), "http://ex/age");
    }

    #[test]
    fn expands_sibling_column_reference_per_scenario_s5() {
        let template = UriTemplate::parse("http://ex/p/{id}").unwrap();
        let values = scalar(&[("id", "7")]);
        assert_eq!(template.expand(&values), "http://ex/p/7");
    }

    #[test]
    fn missing_variable_expands_to_empty_string() {
        let template = UriTemplate::parse("http://ex/{missing}/x").unwrap();
        let values = BTreeMap::new();
        assert_eq!(template.expand(&values), "http://ex//x");
    }

    #[test]
    fn percent_encodes_reserved_characters_by_default() {
        let template = UriTemplate::parse("/{name}").unwrap();
        let values = scalar(&[("name", "a b/c")]);
        assert_eq!(template.expand(&values), "/a%20b%2Fc");
    }

    #[test]
    fn reserved_expansion_operator_leaves_slashes_unescaped() {
        let template = UriTemplate::parse("/{+path}").unwrap();
        let values = scalar(&[("path", "a/b")]);
        assert_eq!(template.expand(&values), "/a/b");
    }

    #[test]
    fn parse_rejects_unterminated_expression() {
        assert!(UriTemplate::parse("http://ex/{unterminated").is_err());
    }

    proptest::proptest! {
        #[test]
        fn a_template_with_no_braces_expands_to_itself(literal in "[a-zA-Z0-9/:._-]{0,64}") {
            let template = UriTemplate::parse(&literal).unwrap();
            let expanded = template.expand(&BTreeMap::new());
            proptest::prop_assert_eq!(expanded, literal);
        }
    }
}
