//! Typed cell values plus the numeric/date/time/duration parsers the cell
//! interpreter (C6) dispatches on.
//!
//! Grounded on the teacher's `data.rs`: the `Value` enum there (one
//! variant per `ColumnType`) becomes [`CellValue`] (one variant per CSVW
//! datatype family); `parse_naive_date`/`parse_naive_datetime`/
//! `parse_naive_time`'s fallback-format-list idiom becomes the
//! format-table lookups below, generalized to accept an explicit CSVW
//! `format` string instead of always guessing.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CellError;

/// A fully interpreted cell value, after datatype coercion.
///
/// `Literal` is the fallback used for the `Other` dispatch branch in
/// `spec.md` §4.4 step 4.e, and for cells that failed to parse (the raw
/// string is still carried so the cell is never silently dropped).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CellValue {
    String { value: String, lang: Option<String> },
    Number(Decimal),
    Boolean(bool),
    Date { canonical: String, value: NaiveDate },
    DateTime { canonical: String, value: NaiveDateTime, offset: Option<String> },
    Time { canonical: String, value: NaiveTime, offset: Option<String> },
    Duration(String),
    Literal { lexical: String, datatype_iri: String },
}

impl CellValue {
    /// The canonical lexical form, used both for display and for
    /// URI-template variable substitution.
    pub fn as_lexical(&self) -> String {
        match self {
            CellValue::String { value, .. } => value.clone(),
            CellValue::Number(d) => d.to_string(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Date { canonical, .. } => canonical.clone(),
            CellValue::DateTime { canonical, .. } => canonical.clone(),
            CellValue::Time { canonical, .. } => canonical.clone(),
            CellValue::Duration(s) => s.clone(),
            CellValue::Literal { lexical, .. } => lexical.clone(),
        }
    }
}

/// A parsed `format` facet for numeric datatypes (`spec.md` §4.4 step
/// 4.d "Numeric").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberFormat {
    pub pattern: Option<String>,
    pub decimal_char: char,
    pub group_char: Option<char>,
}

impl NumberFormat {
    pub fn new() -> Self {
        Self { pattern: None, decimal_char: '.', group_char: None }
    }

    /// Parses the `format` facet, which may be a bare pattern string or a
    /// `{pattern?,decimalChar?,groupChar?}` object.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let mut format = Self::new();
        match value {
            serde_json::Value::String(pattern) => format.pattern = Some(pattern.clone()),
            serde_json::Value::Object(map) => {
                if let Some(pattern) = map.get("pattern").and_then(|v| v.as_str()) {
                    format.pattern = Some(pattern.to_string());
                }
                if let Some(decimal_char) = map.get("decimalChar").and_then(|v| v.as_str()) {
                    if let Some(c) = decimal_char.chars().next() {
                        format.decimal_char = c;
                    }
                }
                if let Some(group_char) = map.get("groupChar").and_then(|v| v.as_str()) {
                    format.group_char = group_char.chars().next();
                }
            }
            _ => {}
        }
        format
    }
}

/// Parses a numeric cell per `spec.md` §4.4 step 4.d: reject a doubled
/// group character, strip group characters, swap the decimal character
/// for `.`, strip a trailing `%` (÷100) or `‰` (÷1000), then parse as a
/// decimal.
pub fn parse_number(raw: &str, format: &NumberFormat) -> Result<Decimal, CellError> {
    if let Some(pattern) = &format.pattern
        && !pattern.is_empty()
    {
        validate_number_pattern(raw, pattern)?;
    }

    let mut body = raw.trim();
    let mut divisor: Option<u32> = None;
    if let Some(stripped) = body.strip_suffix('%') {
        divisor = Some(100);
        body = stripped;
    } else if let Some(stripped) = body.strip_suffix('\u{2030}') {
        divisor = Some(1000);
        body = stripped;
    }

    if let Some(group_char) = format.group_char {
        let doubled = format!("{group_char}{group_char}");
        if body.contains(doubled.as_str()) {
            return Err(CellError::new(format!(
                "{raw} is not a valid number: repeating '{group_char}'"
            )));
        }
    }

    let mut sanitized = String::with_capacity(body.len());
    for ch in body.chars() {
        if Some(ch) == format.group_char {
            continue;
        }
        if ch == format.decimal_char {
            sanitized.push('.');
        } else {
            sanitized.push(ch);
        }
    }

    let mut decimal = Decimal::from_str(sanitized.trim())
        .map_err(|_| CellError::new(format!("{raw} is not a valid number")))?;
    if let Some(divisor) = divisor {
        decimal /= Decimal::from(divisor);
    }
    Ok(decimal)
}

fn validate_number_pattern(raw: &str, pattern: &str) -> Result<(), CellError> {
    let has_exponent_marker = pattern.contains('E');
    let looks_exponential = raw.to_ascii_uppercase().contains('E');
    if looks_exponential != has_exponent_marker {
        return Err(CellError::new(format!("{raw} does not match pattern '{pattern}'")));
    }
    Ok(())
}

/// Parses a boolean cell per `spec.md` §4.4 step 4.d "Boolean".
pub fn parse_boolean(raw: &str, format: Option<&str>) -> Result<bool, CellError> {
    if let Some(format) = format
        && let Some((true_token, false_token)) = format.split_once('|')
    {
        if raw == true_token {
            return Ok(true);
        }
        if raw == false_token {
            return Ok(false);
        }
        return Err(CellError::new(format!("{raw} is not a valid boolean")));
    }

    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(CellError::new(format!("{raw} is not a valid boolean"))),
    }
}

const DATE_PATTERNS: &[(&str, &str)] = &[
    ("yyyy-MM-dd", "%Y-%m-%d"),
    ("yyyyMMdd", "%Y%m%d"),
    ("dd-MM-yyyy", "%d-%m-%Y"),
    ("d-M-yyyy", "%-d-%-m-%Y"),
    ("MM-dd-yyyy", "%m-%d-%Y"),
    ("M-d-yyyy", "%-m-%-d-%Y"),
    ("dd/MM/yyyy", "%d/%m/%Y"),
    ("d/M/yyyy", "%-d/%-m/%Y"),
    ("MM/dd/yyyy", "%m/%d/%Y"),
    ("M/d/yyyy", "%-m/%-d/%Y"),
    ("dd.MM.yyyy", "%d.%m.%Y"),
    ("d.M.yyyy", "%-d.%-m.%Y"),
    ("MM.dd.yyyy", "%m.%d.%Y"),
    ("M.d.yyyy", "%-m.%-d.%Y"),
];

const TIME_PATTERNS: &[(&str, &str)] = &[
    ("HH:mm:ss", "%H:%M:%S"),
    ("HHmmss", "%H%M%S"),
    ("HH:mm", "%H:%M"),
    ("HHmm", "%H%M"),
];

static TIMEZONE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Z|[+-]\d{2}(:?\d{2})?)$").expect("static timezone regex is valid")
});

/// Splits an optional timezone suffix (`Z`, `+07:00`, `+0700`, `+07`) off
/// the end of a lexical date/time/dateTime value.
fn split_timezone(raw: &str) -> (&str, Option<String>) {
    if let Some(m) = TIMEZONE_SUFFIX.find(raw) {
        (&raw[..m.start()], Some(raw[m.start()..].to_ascii_uppercase()))
    } else {
        (raw, None)
    }
}

/// Parses a `date` (or `gDay`/`gMonth`/... treated identically for the
/// supported subset) cell per `spec.md` §4.4 step 4.d.
pub fn parse_date(raw: &str, format: Option<&str>) -> Result<(NaiveDate, String), CellError> {
    let (body, _tz) = split_timezone(raw);
    let chrono_fmt = match format {
        Some(fmt) => DATE_PATTERNS
            .iter()
            .find(|(pattern, _)| *pattern == fmt)
            .map(|(_, chrono_fmt)| *chrono_fmt)
            .ok_or_else(|| CellError::new(format!("unrecognized date format '{fmt}'")))?,
        None => "%Y-%m-%d",
    };
    let parsed = NaiveDate::parse_from_str(body, chrono_fmt)
        .map_err(|_| CellError::new(format!("{raw} is not a valid date")))?;
    let canonical = parsed.format("%Y-%m-%d").to_string();
    Ok((parsed, canonical))
}

/// Parses a `dateTime`/`dateTimeStamp` cell.
pub fn parse_date_time(
    raw: &str,
    format: Option<&str>,
) -> Result<(NaiveDateTime, String, Option<String>), CellError> {
    let (body, tz) = split_timezone(raw);

    let chrono_fmt = match format {
        Some(fmt) => {
            if let Some((date_part, time_part)) = fmt.split_once('T') {
                let date_fmt = DATE_PATTERNS
                    .iter()
                    .find(|(pattern, _)| *pattern == date_part)
                    .map(|(_, chrono_fmt)| *chrono_fmt);
                let time_fmt = TIME_PATTERNS
                    .iter()
                    .find(|(pattern, _)| *pattern == time_part)
                    .map(|(_, chrono_fmt)| *chrono_fmt);
                match (date_fmt, time_fmt) {
                    (Some(d), Some(t)) => format!("{d}T{t}"),
                    _ => {
                        return Err(CellError::new(format!(
                            "unrecognized dateTime format '{fmt}'"
                        )));
                    }
                }
            } else {
                return Err(CellError::new(format!("unrecognized dateTime format '{fmt}'")));
            }
        }
        None => "%Y-%m-%dT%H:%M:%S".to_string(),
    };

    let parsed = NaiveDateTime::parse_from_str(body, &chrono_fmt)
        .or_else(|_| NaiveDateTime::parse_from_str(body, &format!("{chrono_fmt}%.f")))
        .map_err(|_| CellError::new(format!("{raw} is not a valid dateTime")))?;
    let canonical = match &tz {
        Some(offset) => format!("{}{}", parsed.format("%Y-%m-%dT%H:%M:%S"), offset),
        None => parsed.format("%Y-%m-%dT%H:%M:%S").to_string(),
    };
    Ok((parsed, canonical, tz))
}

/// Parses a `time` cell.
pub fn parse_time(
    raw: &str,
    format: Option<&str>,
) -> Result<(NaiveTime, String, Option<String>), CellError> {
    let (body, tz) = split_timezone(raw);
    let chrono_fmt = match format {
        Some(fmt) => TIME_PATTERNS
            .iter()
            .find(|(pattern, _)| *pattern == fmt)
            .map(|(_, chrono_fmt)| *chrono_fmt)
            .ok_or_else(|| CellError::new(format!("unrecognized time format '{fmt}'")))?,
        None => "%H:%M:%S",
    };
    let parsed = NaiveTime::parse_from_str(body, chrono_fmt)
        .map_err(|_| CellError::new(format!("{raw} is not a valid time")))?;
    let canonical = match &tz {
        Some(offset) => format!("{}{}", parsed.format("%H:%M:%S"), offset),
        None => parsed.format("%H:%M:%S").to_string(),
    };
    Ok((parsed, canonical, tz))
}

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?P(\d+Y)?(\d+M)?(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d+)?S)?)?$")
        .expect("static duration regex is valid")
});

/// Validates a `duration`/`dayTimeDuration`/`yearMonthDuration` lexical
/// form (`spec.md` §4.4 step 4.d). The lexical form passes through
/// unchanged; only its shape is checked.
pub fn parse_duration(raw: &str, base: &str) -> Result<String, CellError> {
    if raw == "P" || raw == "-P" || !DURATION_PATTERN.is_match(raw) {
        return Err(CellError::new(format!("{raw} is not a valid {base}")));
    }
    let has_time_part = raw.contains('T');
    match base {
        "dayTimeDuration" if raw.contains('Y') || (raw.contains('M') && !has_time_part) => {
            return Err(CellError::new(format!("{raw} is not a valid {base}")));
        }
        "yearMonthDuration" if has_time_part || raw.contains('D') => {
            return Err(CellError::new(format!("{raw} is not a valid {base}")));
        }
        _ => {}
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_number_applies_group_and_decimal_char() {
        let format = NumberFormat { pattern: None, decimal_char: ',', group_char: Some('.') };
        let parsed = parse_number("1.234,50", &format).unwrap();
        assert_eq!(parsed, Decimal::from_str("1234.50").unwrap());
    }

    #[test]
    fn parse_number_rejects_doubled_group_char() {
        let format = NumberFormat { pattern: None, decimal_char: ',', group_char: Some('.') };
        let err = parse_number("1..234,50", &format).unwrap_err();
        assert!(err.to_string().contains("repeating"));
    }

    #[test]
    fn parse_number_strips_percent_and_divides() {
        let format = NumberFormat::new();
        let parsed = parse_number("50%", &format).unwrap();
        assert_eq!(parsed, Decimal::from_str("0.50").unwrap());
    }

    #[test]
    fn parse_boolean_defaults_match_spec() {
        assert!(parse_boolean("1", None).unwrap());
        assert!(parse_boolean("TRUE", None).unwrap());
        assert!(!parse_boolean("0", None).unwrap());
        assert!(parse_boolean("T", Some("T|F")).unwrap());
        assert!(!parse_boolean("F", Some("T|F")).unwrap());
    }

    #[test]
    fn parse_date_with_explicit_format_matches_scenario_s4() {
        let (_, canonical) = parse_date("04/07/1776", Some("dd/MM/yyyy")).unwrap();
        assert_eq!(canonical, "1776-07-04");
    }

    #[test]
    fn parse_date_without_format_uses_iso() {
        let (_, canonical) = parse_date("2024-01-05", None).unwrap();
        assert_eq!(canonical, "2024-01-05");
    }

    #[test]
    fn parse_date_time_without_format_handles_timezone_suffix() {
        let (_, canonical, offset) = parse_date_time("2024-01-05T10:20:30+02:00", None).unwrap();
        assert_eq!(canonical, "2024-01-05T10:20:30+02:00");
        assert_eq!(offset, Some("+02:00".to_string()));
    }

    #[test]
    fn parse_duration_accepts_day_time_and_year_month_forms() {
        assert!(parse_duration("P3Y6M4DT12H30M5S", "duration").is_ok());
        assert!(parse_duration("PT1H", "dayTimeDuration").is_ok());
        assert!(parse_duration("P2Y6M", "yearMonthDuration").is_ok());
        assert!(parse_duration("P2Y6M", "dayTimeDuration").is_err());
    }

    #[test]
    fn parse_duration_rejects_malformed_lexical() {
        assert!(parse_duration("not-a-duration", "duration").is_err());
    }
}
