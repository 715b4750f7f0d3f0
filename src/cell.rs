//! Cell interpreter (C6, `spec.md` §4.4): per-cell trim/null/split,
//! datatype coercion + facet checks, and `aboutUrl`/`propertyUrl`/
//! `valueUrl` expansion.
//!
//! Grounded on the teacher's `data.rs::parse_typed_value` dispatch (one
//! match arm per `ColumnType`) and `schema.rs`'s facet `ensure!` checks,
//! generalized from a closed column-type enum to the full CSVW datatype
//! family table in [`crate::datatype`].

use std::collections::BTreeMap;

use crate::context::Context;
use crate::datatype::{self, DatatypeFamily};
use crate::metadata::node::{Arena, ColumnData, DatatypeDecl, NodeId, NodeKind, NullSpec, Trim};
use crate::metadata::parse::Metadata;
use crate::uri_template::{TemplateValue, UriTemplate};
use crate::value::{self, CellValue, NumberFormat};

/// A single interpreted cell (`spec.md` §3 "Cell").
#[derive(Debug, Clone)]
pub struct Cell {
    pub column: NodeId,
    pub string_value: String,
    pub value: CellData,
    pub about_url: Option<String>,
    pub property_url: Option<String>,
    pub value_url: Option<String>,
    pub errors: Vec<String>,
}

/// The cell's typed value: a single scalar (no `separator` configured),
/// or the list produced by splitting on `separator` (`spec.md` §4.4
/// step 3). Either can hold `null` entries (`spec.md` §8 property 7).
#[derive(Debug, Clone)]
pub enum CellData {
    Single(Option<CellValue>),
    List(Vec<Option<CellValue>>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        match &self.value {
            CellData::Single(v) => v.is_none(),
            CellData::List(items) => items.iter().all(|v| v.is_none()),
        }
    }
}

/// Interprets one logical data row: `raw` holds one string per column in
/// `schema`'s column order (virtual columns get an empty string, per
/// `spec.md` §4.3's "missing trailing fields... filled with the
/// column's `null` or `""`"). `table_base` is the table's own URL,
/// against which `aboutUrl`/`propertyUrl`/`valueUrl` are resolved.
pub fn interpret_row(
    metadata: &Metadata,
    schema_id: NodeId,
    raw: &[String],
    row_number: usize,
    source_row_number: usize,
    table_base: &Context,
) -> Vec<Cell> {
    let arena = &metadata.arena;
    let NodeKind::Schema(schema) = &arena.node(schema_id).kind else {
        return Vec::new();
    };

    // Pass 1: trim/null/split/datatype/facets for every column, and the
    // "post-processed string" each column contributes to URI-template
    // variables (`spec.md` §4.4 step 6 "mapped_values").
    struct Interpreted {
        cell: Cell,
        mapped: TemplateValue,
    }

    let mut interpreted: Vec<Interpreted> = Vec::with_capacity(schema.columns.len());
    for (index, &column_id) in schema.columns.iter().enumerate() {
        let raw_value = raw.get(index).map(|s| s.as_str()).unwrap_or("");
        let (cell, mapped) = interpret_cell(arena, column_id, raw_value, row_number, source_row_number);
        interpreted.push(Interpreted { cell, mapped });
    }

    // Pass 2: build the shared `mapped_values` map (every column name
    // plus the positional variables), then expand each column's
    // `aboutUrl`/`propertyUrl`/`valueUrl` against it.
    let mut mapped_values: BTreeMap<String, TemplateValue> = BTreeMap::new();
    for (index, &column_id) in schema.columns.iter().enumerate() {
        if let NodeKind::Column(column) = &arena.node(column_id).kind
            && let Some(name) = &column.name
        {
            mapped_values.insert(name.clone(), interpreted[index].mapped.clone());
        }
    }
    mapped_values.insert("_row".to_string(), TemplateValue::Scalar(row_number.to_string()));
    mapped_values.insert("_sourceRow".to_string(), TemplateValue::Scalar(source_row_number.to_string()));

    for (index, &column_id) in schema.columns.iter().enumerate() {
        let NodeKind::Column(column) = &arena.node(column_id).kind else { continue };
        let mut per_cell = mapped_values.clone();
        per_cell.insert("_name".to_string(), TemplateValue::Scalar(column.name.clone().unwrap_or_default()));
        per_cell.insert("_column".to_string(), TemplateValue::Scalar(column.number.to_string()));
        per_cell.insert("_sourceColumn".to_string(), TemplateValue::Scalar(column.number.to_string()));

        let about_url = arena.resolve_about_url(column_id).and_then(|t| expand_and_resolve(&t, &per_cell, table_base));
        let property_url = arena.resolve_property_url(column_id).and_then(|t| expand_and_resolve(&t, &per_cell, table_base));
        let mut value_url = arena.resolve_value_url(column_id).and_then(|t| expand_and_resolve(&t, &per_cell, table_base));

        let cell = &mut interpreted[index].cell;
        if value_url.is_some() && cell.is_null() && !column.virtual_ {
            value_url = None;
        }
        cell.about_url = about_url;
        cell.property_url = property_url;
        cell.value_url = value_url;
    }

    interpreted.into_iter().map(|i| i.cell).collect()
}

fn expand_and_resolve(template: &str, values: &BTreeMap<String, TemplateValue>, base: &Context) -> Option<String> {
    let parsed = UriTemplate::parse(template).ok()?;
    let expanded = parsed.expand(values);
    Some(base.expand_iri(&expanded))
}

/// Interprets a single cell per `spec.md` §4.4 steps 1-5. Returns the
/// [`Cell`] (without URI templates, filled in by the caller) and the
/// "post-processed string" used as this column's URI-template variable.
fn interpret_cell(
    arena: &Arena,
    column_id: NodeId,
    raw: &str,
    _row_number: usize,
    _source_row_number: usize,
) -> (Cell, TemplateValue) {
    let NodeKind::Column(column) = &arena.node(column_id).kind else {
        return (
            Cell {
                column: column_id,
                string_value: raw.to_string(),
                value: CellData::Single(Some(CellValue::String { value: raw.to_string(), lang: None })),
                about_url: None,
                property_url: None,
                value_url: None,
                errors: Vec::new(),
            },
            TemplateValue::Scalar(raw.to_string()),
        );
    };

    let datatype = arena.resolve_datatype(column_id);
    let lang = arena.resolve_lang(column_id);
    let null_spec = arena.resolve_null(column_id);
    let default = arena.resolve_default(column_id);
    let separator = arena.resolve_separator(column_id);
    let trim = resolve_trim(arena, column_id);
    let mut errors = Vec::new();

    // Step 1: pre-normalize control characters / whitespace collapse.
    let mut normalized = raw.to_string();
    if !datatype::is_preserve_whitespace_base(&datatype.base) {
        normalized = normalized.replace(['\r', '\t', '\u{07}'], " ");
    }
    if !datatype::is_skip_collapse_base(&datatype.base) {
        normalized = collapse_whitespace(normalized.trim());
    }

    // Step 2: default substitution on the whole string.
    if normalized.is_empty() {
        normalized = default.clone();
    }

    // Step 3: list split.
    let items: Vec<String> = match &separator {
        Some(sep) if !sep.is_empty() => normalized.split(sep.as_str()).map(|s| s.to_string()).collect(),
        _ => vec![normalized.clone()],
    };

    let mut values: Vec<Option<CellValue>> = Vec::with_capacity(items.len());
    let mut mapped_items: Vec<String> = Vec::with_capacity(items.len());

    for item in items {
        let (value, mapped, mut item_errors) = interpret_item(&item, column, &datatype, &lang, &null_spec, &default, trim);
        errors.append(&mut item_errors);
        values.push(value);
        mapped_items.push(mapped);
    }

    let (cell_value, mapped) = if separator.as_deref().map(|s| !s.is_empty()).unwrap_or(false) {
        (CellData::List(values), TemplateValue::List(mapped_items))
    } else {
        (
            CellData::Single(values.into_iter().next().flatten()),
            TemplateValue::Scalar(mapped_items.into_iter().next().unwrap_or_default()),
        )
    };

    (
        Cell {
            column: column_id,
            string_value: raw.to_string(),
            value: cell_value,
            about_url: None,
            property_url: None,
            value_url: None,
            errors,
        },
        mapped,
    )
}

fn resolve_trim(arena: &Arena, column_id: NodeId) -> Trim {
    // `trim` is a dialect-only property; the cell interpreter applies the
    // nearest ancestor's resolved dialect trim policy if one is
    // reachable (Table first, then TableGroup), else the documented
    // `false` default for plain strings (`spec.md` §3 Dialect).
    let mut current = Some(column_id);
    while let Some(id) = current {
        let dialect_id = match &arena.node(id).kind {
            NodeKind::Table(table) => table.dialect,
            NodeKind::TableGroup(group) => group.dialect,
            _ => None,
        };
        if let Some(dialect_id) = dialect_id
            && let NodeKind::Dialect(dialect) = &arena.node(dialect_id).kind
        {
            return dialect.trim;
        }
        current = arena.node(id).parent;
    }
    Trim::False
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Steps 4a-4e for one split item: strip, null substitution, per-base
/// dispatch, and facet checks. Returns the typed value (`None` for
/// null), the mapped string used for URI templates, and any errors.
fn interpret_item(
    item: &str,
    column: &ColumnData,
    datatype: &DatatypeDecl,
    lang: &str,
    null_spec: &NullSpec,
    default: &str,
    trim: Trim,
) -> (Option<CellValue>, String, Vec<String>) {
    let mut errors = Vec::new();

    // 4a: strip non-string-like items; re-substitute default if now empty.
    let mut working = item.to_string();
    if !matches!(datatype.base.as_str(), "string" | "anyAtomicType" | "any") {
        working = working.trim().to_string();
        if working.is_empty() {
            working = default.to_string();
        }
    }

    // 4b: null substitution.
    if null_spec.matches(&working) {
        return (None, working, errors);
    }

    // 4c: trim per dialect rule (string-like) or strip (otherwise).
    let processed = if matches!(datatype.base.as_str(), "string" | "anyAtomicType" | "any" | "json" | "xml" | "html") {
        trim.apply(&working).to_string()
    } else {
        working.trim().to_string()
    };

    // 4d: dispatch on datatype family.
    let value = match datatype::family_of(&datatype.base) {
        DatatypeFamily::Unsupported => {
            errors.push("unsupported datatype".to_string());
            CellValue::Literal { lexical: processed.clone(), datatype_iri: iri_for(&datatype.base) }
        }
        DatatypeFamily::Numeric => {
            let format = datatype.format.as_ref().map(NumberFormat::from_json).unwrap_or_else(NumberFormat::new);
            match value::parse_number(&processed, &format) {
                Ok(number) => CellValue::Number(number),
                Err(err) => {
                    errors.push(err.to_string());
                    CellValue::Literal { lexical: processed.clone(), datatype_iri: iri_for(&datatype.base) }
                }
            }
        }
        DatatypeFamily::Boolean => {
            let format = datatype.format.as_ref().and_then(|f| f.as_str());
            match value::parse_boolean(&processed, format) {
                Ok(b) => CellValue::Boolean(b),
                Err(err) => {
                    errors.push(err.to_string());
                    CellValue::Literal { lexical: processed.clone(), datatype_iri: iri_for(&datatype.base) }
                }
            }
        }
        DatatypeFamily::Date => {
            let format = datatype.format.as_ref().and_then(|f| f.as_str());
            match value::parse_date(&processed, format) {
                Ok((parsed, canonical)) => CellValue::Date { canonical, value: parsed },
                Err(err) => {
                    errors.push(err.to_string());
                    CellValue::Literal { lexical: processed.clone(), datatype_iri: iri_for(&datatype.base) }
                }
            }
        }
        DatatypeFamily::DateTime => {
            let format = datatype.format.as_ref().and_then(|f| f.as_str());
            match value::parse_date_time(&processed, format) {
                Ok((parsed, canonical, offset)) => CellValue::DateTime { canonical, value: parsed, offset },
                Err(err) => {
                    errors.push(err.to_string());
                    CellValue::Literal { lexical: processed.clone(), datatype_iri: iri_for(&datatype.base) }
                }
            }
        }
        DatatypeFamily::Time => {
            let format = datatype.format.as_ref().and_then(|f| f.as_str());
            match value::parse_time(&processed, format) {
                Ok((parsed, canonical, offset)) => CellValue::Time { canonical, value: parsed, offset },
                Err(err) => {
                    errors.push(err.to_string());
                    CellValue::Literal { lexical: processed.clone(), datatype_iri: iri_for(&datatype.base) }
                }
            }
        }
        DatatypeFamily::Duration => match value::parse_duration(&processed, &datatype.base) {
            Ok(lexical) => CellValue::Duration(lexical),
            Err(err) => {
                errors.push(err.to_string());
                CellValue::Literal { lexical: processed.clone(), datatype_iri: iri_for(&datatype.base) }
            }
        },
        DatatypeFamily::Other => {
            if let Some(format) = datatype.format.as_ref().and_then(|f| f.as_str())
                && format != processed
            {
                errors.push(format!("{processed} does not match pattern '{format}'"));
            }
            if datatype.base == "string" {
                CellValue::String { value: processed.clone(), lang: Some(lang.to_string()) }
            } else {
                CellValue::Literal { lexical: processed.clone(), datatype_iri: iri_for(&datatype.base) }
            }
        }
    };

    // 4e: facet checks.
    let char_count = item.trim().chars().count();
    check_length_facets(datatype, char_count, &mut errors);
    check_bounds_facets(datatype, &value, &mut errors);

    let _ = column; // column currently only informs whitespace handling upstream
    let mapped = value.as_lexical();
    (Some(value), mapped, errors)
}

fn iri_for(base: &str) -> String {
    datatype::builtin_iri(base).map(str::to_string).unwrap_or_else(|| base.to_string())
}

fn check_length_facets(datatype: &DatatypeDecl, char_count: usize, errors: &mut Vec<String>) {
    if let Some(length) = datatype.length
        && char_count as u64 != length
    {
        errors.push(format!("value has length {char_count}, expected exactly {length}"));
    }
    if let Some(min_length) = datatype.min_length
        && (char_count as u64) < min_length
    {
        errors.push(format!("value has length {char_count}, expected at least {min_length}"));
    }
    if let Some(max_length) = datatype.max_length
        && (char_count as u64) > max_length
    {
        errors.push(format!("value has length {char_count}, expected at most {max_length}"));
    }
}

fn check_bounds_facets(datatype: &DatatypeDecl, value: &CellValue, errors: &mut Vec<String>) {
    if !datatype::is_ordered_base(&datatype.base) {
        return;
    }
    let CellValue::Number(number) = value else { return };
    use rust_decimal::Decimal;
    use std::str::FromStr;
    let parse = |s: &str| Decimal::from_str(s).ok();

    if let Some(min) = datatype.minimum.as_deref().or(datatype.min_inclusive.as_deref())
        && let Some(min) = parse(min)
        && *number < min
    {
        errors.push(format!("{number} is less than the minimum {min}"));
    }
    if let Some(max) = datatype.maximum.as_deref().or(datatype.max_inclusive.as_deref())
        && let Some(max) = parse(max)
        && *number > max
    {
        errors.push(format!("{number} is greater than the maximum {max}"));
    }
    if let Some(min) = &datatype.min_exclusive
        && let Some(min) = parse(min)
        && *number <= min
    {
        errors.push(format!("{number} is not greater than the exclusive minimum {min}"));
    }
    if let Some(max) = &datatype.max_exclusive
        && let Some(max) = parse(max)
        && *number >= max
    {
        errors.push(format!("{number} is not less than the exclusive maximum {max}"));
    }
}
