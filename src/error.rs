//! Typed error taxonomy for the CSVW core, plus a non-fatal warnings sink.
//!
//! Recoverable problems (an invalid property value, a row-level datatype
//! mismatch) are recorded on a [`Diagnostics`] collector rather than
//! propagated; only the kinds below escalate to a `Result::Err`.

use thiserror::Error;

/// A metadata node's type could not be determined or is not recognized.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("could not determine metadata node type{}", .0.as_ref().map(|ctx| format!(": {ctx}")).unwrap_or_default())]
pub struct MetadataTypeError(pub Option<String>);

impl MetadataTypeError {
    pub fn new(context: impl Into<String>) -> Self {
        Self(Some(context.into()))
    }
}

/// One or more validation rules in `spec.md` §4.1 failed.
///
/// Carries every violation found in a single pass so callers see the whole
/// picture at once, matching `validate!`'s grouped multi-line contract.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{}", .0.join("\n"))]
pub struct MetadataValidationError(pub Vec<String>);

impl MetadataValidationError {
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Two metadata documents could not be merged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("cannot merge a {left} node with a {right} node")]
    IncompatibleClasses { left: &'static str, right: &'static str },
    #[error(
        "column count mismatch during merge: {non_virtual} non-virtual user column(s) vs {embedded} embedded column(s)"
    )]
    ColumnCountMismatch { non_virtual: usize, embedded: usize },
    #[error("could not align column at index {index} during merge")]
    UnresolvableColumn { index: usize },
    #[error("table URLs do not match: {user} vs {embedded}")]
    UrlMismatch { user: String, embedded: String },
}

/// A dialect atom (delimiter, quote char, comment prefix, ...) was invalid.
///
/// Per `spec.md` §7, dialect errors are downgraded to a warning with default
/// substitution unless the slot is required; this type exists so callers who
/// *do* want to treat a dialect error as fatal (e.g. strict-mode CLI use)
/// have something concrete to match on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DialectError {
    #[error("dialect property '{property}' must be a single character, got {value:?}")]
    NotSingleChar { property: &'static str, value: String },
    #[error("dialect property '{property}' must be a non-negative integer, got {value:?}")]
    NotNonNegativeInteger { property: &'static str, value: String },
    #[error("dialect property 'trim' must be a boolean or one of 'start'/'end', got {value:?}")]
    InvalidTrim { value: String },
}

/// A URI template (`aboutUrl`/`propertyUrl`/`valueUrl`) failed to parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UriTemplateError {
    #[error("URI template {value:?} has an unterminated '{{' expression")]
    UnterminatedExpression { value: String },
}

/// A data row had fewer fields than the schema's non-virtual columns require.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("row {source_number}: expected at least {expected} field(s), found {found}")]
pub struct RowWidthError {
    pub source_number: usize,
    pub expected: usize,
    pub found: usize,
}

/// A single cell-level datatype, format, or facet failure.
///
/// Never fatal: the offending [`crate::cell::Cell`] is still emitted with a
/// fallback plain-literal value, and this message is appended to its
/// `errors` list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CellError(pub String);

impl CellError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Top-level error type for operations that can fail fatally.
#[derive(Debug, Error)]
pub enum CsvwError {
    #[error(transparent)]
    Type(#[from] MetadataTypeError),
    #[error(transparent)]
    Validation(#[from] MetadataValidationError),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Dialect(#[from] DialectError),
    #[error(transparent)]
    UriTemplate(#[from] UriTemplateError),
    #[error(transparent)]
    RowWidth(#[from] RowWidthError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CsvwError>;

/// Non-fatal warnings accumulated during parse/normalize/validate.
///
/// Threaded explicitly through `ParseOptions` rather than kept as
/// process-wide state (REDESIGN FLAGS §9: "no process-wide state").
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_validation_error_joins_messages_with_newlines() {
        let err = MetadataValidationError(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(err.to_string(), "first\nsecond");
    }

    #[test]
    fn diagnostics_collects_warnings_in_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn("a");
        diagnostics.warn("b");
        assert_eq!(diagnostics.warnings(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn row_width_error_message_matches_spec_shape() {
        let err = RowWidthError {
            source_number: 5,
            expected: 3,
            found: 2,
        };
        assert_eq!(err.to_string(), "row 5: expected at least 3 field(s), found 2");
    }
}
