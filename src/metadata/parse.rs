//! Metadata construction (`spec.md` §4.1 "Construction") and the public
//! entry points `Metadata::parse`/`::open`/`::for_input` (§6).
//!
//! Construction never fails except for an unresolvable node type
//! (`MetadataTypeError`); every other invalid property value becomes a
//! [`Diagnostics`] warning with the slot reverting to its default or
//! being dropped (`spec.md` §9 Open Question 1), matching the
//! propagation policy in `spec.md` §7.

use regex::Regex;
use serde_json::Value as Json;
use std::sync::LazyLock;

use crate::context::{CSVW_NAMESPACE, Context};
use crate::error::{CsvwError, Diagnostics, MetadataTypeError, Result};
use crate::fetch::Fetcher;
use crate::metadata::node::{
    Arena, ColumnData, DatatypeDecl, DialectData, ForeignKey, ForeignKeyReference, NodeId, NodeKind,
    SchemaData, TableData, TableDirection, TableGroupData, TextDirection, TransformationData,
    TransformationSource, Trim,
};
use crate::metadata::property::{
    dedupe_und, normalize_natural_language, validate_boolean, validate_column_reference,
    validate_enum, validate_language_tag, validate_non_negative_integer, validate_null_spec,
    validate_single_char, validate_uri_template,
};

static COLUMN_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:_col|[A-Za-z0-9]|%[0-9A-Fa-f]{2})(?:[A-Za-z0-9._]|%[0-9A-Fa-f]{2})*$")
        .expect("static column-name regex is valid")
});

/// Options threaded explicitly through parsing (REDESIGN FLAGS §9: "no
/// process-wide state").
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub base_url: Option<url::Url>,
    pub default_language: Option<String>,
    pub strict: bool,
}

/// A fully parsed metadata document: the node arena, its root
/// `TableGroup`, and the value context used to resolve IRIs.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub arena: Arena,
    pub root: NodeId,
    pub context: Context,
}

impl Metadata {
    /// `Metadata::parse(json, options) -> Metadata | Errors` (`spec.md`
    /// §6). A bare Table document (no `tables` key) is wrapped as an
    /// implicit single-table group, matching how CSVW treats a
    /// standalone table-metadata document.
    pub fn parse(json: &Json, options: &ParseOptions, diagnostics: &mut Diagnostics) -> Result<Metadata> {
        let context_json = json
            .get("@context")
            .cloned()
            .unwrap_or_else(|| Json::String(CSVW_NAMESPACE.to_string()));
        let mut context = Context::from_json(&context_json, options.base_url.clone());
        if let Some(lang) = &options.default_language {
            context.default_language = lang.clone();
        }

        let mut arena = Arena::new();
        let is_table_group = json.as_object().map(|o| o.contains_key("tables")).unwrap_or(false);

        let root = if json.is_object() && !is_table_group {
            let group_id = arena.push(None, NodeKind::TableGroup(TableGroupData::default()));
            let table_id = build_table(json, Some(group_id), &context, &mut arena, diagnostics);
            if let NodeKind::TableGroup(slot) = &mut arena.node_mut(group_id).kind {
                slot.tables.push(table_id);
            }
            group_id
        } else if json.is_object() {
            build_table_group(json, &context, &mut arena, diagnostics)
        } else {
            return Err(CsvwError::Type(MetadataTypeError::new(
                "metadata document must be a JSON object",
            )));
        };

        arena.root = Some(root);
        Ok(Metadata { arena, root, context })
    }

    /// `Metadata::open(url, options)` — retrieves `url` through `fetcher`
    /// and parses it, requesting `application/ld+json, application/json`
    /// semantics by simply expecting JSON bytes back (the `Accept`
    /// header itself is an HTTP-transport concern the `Fetcher`
    /// implementation owns, not the core).
    pub fn open(
        url: &str,
        fetcher: &dyn Fetcher,
        options: &ParseOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<Metadata> {
        let bytes = fetcher
            .fetch(url)?
            .ok_or_else(|| CsvwError::Other(format!("could not fetch metadata document '{url}'")))?;
        let json: Json = serde_json::from_slice(&bytes)?;
        Self::parse(&json, options, diagnostics)
    }

    /// `Metadata::for_input(stream, options) -> TableGroup` — linked
    /// metadata discovery per `spec.md` §6: try `describedby_link`
    /// (the caller-supplied `Link: rel=describedby` target, if any),
    /// then `{base}-metadata.json`, then `metadata.json`. The first
    /// candidate that fetches and parses successfully wins; failures at
    /// any candidate are swallowed and the next is tried.
    pub fn for_input(
        base: &str,
        describedby_link: Option<&str>,
        fetcher: &dyn Fetcher,
        options: &ParseOptions,
        diagnostics: &mut Diagnostics,
    ) -> Result<Metadata> {
        let mut candidates: Vec<String> = Vec::new();
        if let Some(link) = describedby_link {
            candidates.push(link.to_string());
        }
        candidates.push(format!("{base}-metadata.json"));
        candidates.push("metadata.json".to_string());

        for candidate in candidates {
            if let Ok(Some(bytes)) = fetcher.fetch(&candidate)
                && let Ok(json) = serde_json::from_slice::<Json>(&bytes)
                && let Ok(metadata) = Self::parse(&json, options, diagnostics)
            {
                return Ok(metadata);
            }
        }

        Err(CsvwError::Other(format!(
            "no linked metadata document could be discovered for '{base}'"
        )))
    }
}

fn build_inheritable(
    obj: &serde_json::Map<String, Json>,
    context: &Context,
    diagnostics: &mut Diagnostics,
) -> crate::metadata::node::Inheritable {
    use crate::metadata::node::Inheritable;
    let mut inh = Inheritable::default();

    if let Some(v) = obj.get("aboutUrl") {
        match validate_uri_template(v) {
            Some(t) => inh.about_url = Some(t),
            None => diagnostics.warn("invalid property 'aboutUrl'"),
        }
    }
    if let Some(v) = obj.get("propertyUrl") {
        match validate_uri_template(v) {
            Some(t) => inh.property_url = Some(t),
            None => diagnostics.warn("invalid property 'propertyUrl'"),
        }
    }
    if let Some(v) = obj.get("valueUrl") {
        match validate_uri_template(v) {
            Some(t) => inh.value_url = Some(t),
            None => diagnostics.warn("invalid property 'valueUrl'"),
        }
    }
    if let Some(v) = obj.get("datatype") {
        inh.datatype = Some(build_datatype_value(v, diagnostics));
    }
    if let Some(v) = obj.get("default") {
        match v.as_str() {
            Some(s) => inh.default = Some(s.to_string()),
            None => diagnostics.warn("invalid property 'default'"),
        }
    }
    if let Some(v) = obj.get("lang") {
        match validate_language_tag(v) {
            Some(tag) => inh.lang = Some(tag),
            None => diagnostics.warn("invalid property 'lang'"),
        }
    }
    if let Some(v) = obj.get("null") {
        match validate_null_spec(v) {
            Some(spec) => inh.null = Some(spec),
            None => diagnostics.warn("invalid property 'null'"),
        }
    }
    if let Some(v) = obj.get("ordered") {
        match validate_boolean(v) {
            Some(b) => inh.ordered = Some(b),
            None => diagnostics.warn("invalid property 'ordered'"),
        }
    }
    if let Some(v) = obj.get("required") {
        match validate_boolean(v) {
            Some(b) => inh.required = Some(b),
            None => diagnostics.warn("invalid property 'required'"),
        }
    }
    if let Some(v) = obj.get("separator") {
        match v.as_str() {
            Some(s) => inh.separator = Some(s.to_string()),
            None => diagnostics.warn("invalid property 'separator'"),
        }
    }
    if let Some(v) = obj.get("textDirection") {
        match validate_enum(v, &["rtl", "ltr"]) {
            Some("rtl") => inh.text_direction = Some(TextDirection::Rtl),
            Some("ltr") => inh.text_direction = Some(TextDirection::Ltr),
            _ => diagnostics.warn("invalid property 'textDirection'"),
        }
    }

    let _ = context;
    inh
}

fn json_scalar_to_string(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn build_datatype_value(value: &Json, diagnostics: &mut Diagnostics) -> DatatypeDecl {
    match value {
        Json::String(s) => DatatypeDecl { base: s.clone(), ..DatatypeDecl::default() },
        Json::Object(map) => DatatypeDecl {
            base: map.get("base").and_then(|v| v.as_str()).unwrap_or("string").to_string(),
            format: map.get("format").cloned(),
            length: map.get("length").and_then(|v| v.as_u64()),
            min_length: map.get("minLength").and_then(|v| v.as_u64()),
            max_length: map.get("maxLength").and_then(|v| v.as_u64()),
            minimum: map.get("minimum").and_then(json_scalar_to_string),
            maximum: map.get("maximum").and_then(json_scalar_to_string),
            min_inclusive: map.get("minInclusive").and_then(json_scalar_to_string),
            max_inclusive: map.get("maxInclusive").and_then(json_scalar_to_string),
            min_exclusive: map.get("minExclusive").and_then(json_scalar_to_string),
            max_exclusive: map.get("maxExclusive").and_then(json_scalar_to_string),
        },
        _ => {
            diagnostics.warn("invalid property 'datatype'");
            DatatypeDecl::string()
        }
    }
}

fn build_foreign_key(value: &Json, diagnostics: &mut Diagnostics) -> Option<ForeignKey> {
    let obj = value.as_object()?;
    let column_reference = obj
        .get("columnReference")
        .or_else(|| obj.get("columns"))
        .and_then(validate_column_reference)
        .or_else(|| {
            diagnostics.warn("invalid property 'foreignKeys': missing 'columnReference'");
            None
        })?;

    let reference_obj = match obj.get("reference").and_then(|v| v.as_object()) {
        Some(r) => r,
        None => {
            diagnostics.warn("invalid property 'foreignKeys': missing 'reference'");
            return None;
        }
    };

    let has_resource = reference_obj.contains_key("resource");
    let has_schema_reference = reference_obj.contains_key("schemaReference");
    if has_resource && has_schema_reference {
        diagnostics.warn(
            "invalid property 'foreignKeys': 'resource' and 'schemaReference' are mutually exclusive",
        );
        return None;
    }

    let ref_columns = reference_obj
        .get("columnReference")
        .and_then(validate_column_reference)
        .unwrap_or_default();

    let reference = if has_resource {
        let resource = reference_obj.get("resource")?.as_str()?.to_string();
        ForeignKeyReference::Resource { resource, column_reference: ref_columns }
    } else if has_schema_reference {
        let schema_reference = reference_obj.get("schemaReference")?.as_str()?.to_string();
        ForeignKeyReference::SchemaReference { schema_reference, column_reference: ref_columns }
    } else {
        diagnostics.warn(
            "invalid property 'foreignKeys': 'reference' must contain 'resource' or 'schemaReference'",
        );
        return None;
    };

    Some(ForeignKey { column_reference, reference })
}

fn build_column(
    json: &Json,
    parent: Option<NodeId>,
    number: usize,
    context: &Context,
    arena: &mut Arena,
    diagnostics: &mut Diagnostics,
) -> NodeId {
    let mut data = ColumnData { number, ..ColumnData::default() };
    if let Some(obj) = json.as_object() {
        if let Some(v) = obj.get("name") {
            match v.as_str() {
                Some(s) if COLUMN_NAME_PATTERN.is_match(s) => data.name = Some(s.to_string()),
                _ => diagnostics.warn("invalid property 'name'"),
            }
        }
        if let Some(v) = obj.get("titles") {
            data.titles = normalize_natural_language(v, &context.default_language);
            dedupe_und(&mut data.titles);
        }
        if let Some(v) = obj.get("virtual") {
            match validate_boolean(v) {
                Some(b) => data.virtual_ = b,
                None => diagnostics.warn("invalid property 'virtual'"),
            }
        }
        if let Some(v) = obj.get("suppressOutput") {
            match validate_boolean(v) {
                Some(b) => data.suppress_output = b,
                None => diagnostics.warn("invalid property 'suppressOutput'"),
            }
        }
        data.inheritable = build_inheritable(obj, context, diagnostics);
    }
    arena.push(parent, NodeKind::Column(data))
}

fn build_schema(
    json: &Json,
    parent: Option<NodeId>,
    context: &Context,
    arena: &mut Arena,
    diagnostics: &mut Diagnostics,
) -> NodeId {
    let id = arena.push(parent, NodeKind::Schema(SchemaData::default()));
    let mut data = SchemaData::default();
    if let Some(obj) = json.as_object() {
        if let Some(s) = obj.get("@id").and_then(|v| v.as_str()) {
            if s.starts_with("_:") {
                diagnostics.warn("invalid property '@id': must not begin with '_:'");
            } else {
                data.id = Some(s.to_string());
            }
        }
        if let Some(Json::Array(columns)) = obj.get("columns") {
            for (index, column_json) in columns.iter().enumerate() {
                let column_id = build_column(column_json, Some(id), index + 1, context, arena, diagnostics);
                data.columns.push(column_id);
            }
        }
        if let Some(v) = obj.get("primaryKey") {
            match validate_column_reference(v) {
                Some(names) => data.primary_key = names,
                None => diagnostics.warn("invalid property 'primaryKey'"),
            }
        }
        if let Some(Json::Array(foreign_keys)) = obj.get("foreignKeys") {
            for fk_json in foreign_keys {
                if let Some(fk) = build_foreign_key(fk_json, diagnostics) {
                    data.foreign_keys.push(fk);
                }
            }
        }
        data.inheritable = build_inheritable(obj, context, diagnostics);
    }
    if let NodeKind::Schema(slot) = &mut arena.node_mut(id).kind {
        *slot = data;
    }
    id
}

fn build_dialect(
    json: &Json,
    parent: Option<NodeId>,
    arena: &mut Arena,
    diagnostics: &mut Diagnostics,
) -> NodeId {
    let mut data = DialectData::default();
    if let Some(obj) = json.as_object() {
        if let Some(v) = obj.get("commentPrefix") {
            match validate_single_char(v) {
                Some(c) => data.comment_prefix = Some(c),
                None => diagnostics.warn("invalid property 'commentPrefix'"),
            }
        }
        if let Some(v) = obj.get("delimiter") {
            match validate_single_char(v) {
                Some(c) => data.delimiter = c,
                None => diagnostics.warn("invalid property 'delimiter'"),
            }
        }
        if let Some(v) = obj.get("doubleQuote") {
            match validate_boolean(v) {
                Some(b) => data.double_quote = b,
                None => diagnostics.warn("invalid property 'doubleQuote'"),
            }
        }
        if let Some(v) = obj.get("encoding") {
            match v.as_str() {
                Some(s) => data.encoding = s.to_string(),
                None => diagnostics.warn("invalid property 'encoding'"),
            }
        }
        let mut header_row_count_explicit = false;
        if let Some(v) = obj.get("header") {
            match validate_boolean(v) {
                Some(b) => data.header = b,
                None => diagnostics.warn("invalid property 'header'"),
            }
        }
        if let Some(v) = obj.get("headerRowCount") {
            match validate_non_negative_integer(v) {
                Some(n) => {
                    data.header_row_count = n;
                    header_row_count_explicit = true;
                }
                None => diagnostics.warn("invalid property 'headerRowCount'"),
            }
        }
        if !header_row_count_explicit {
            data.header_row_count = if data.header { 1 } else { 0 };
        }
        if let Some(v) = obj.get("lineTerminators") {
            match v {
                Json::Array(items) => {
                    let strings: Vec<String> =
                        items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
                    if strings.is_empty() {
                        diagnostics.warn("invalid property 'lineTerminators'");
                    } else {
                        data.line_terminators = strings;
                    }
                }
                Json::String(s) => data.line_terminators = vec![s.clone()],
                _ => diagnostics.warn("invalid property 'lineTerminators'"),
            }
        }
        if let Some(v) = obj.get("quoteChar") {
            if v.is_null() {
                data.quote_char = None;
            } else {
                match validate_single_char(v) {
                    Some(c) => data.quote_char = Some(c),
                    None => diagnostics.warn("invalid property 'quoteChar'"),
                }
            }
        }
        if let Some(v) = obj.get("skipBlankRows") {
            match validate_boolean(v) {
                Some(b) => data.skip_blank_rows = b,
                None => diagnostics.warn("invalid property 'skipBlankRows'"),
            }
        }
        if let Some(v) = obj.get("skipColumns") {
            match validate_non_negative_integer(v) {
                Some(n) => data.skip_columns = n,
                None => diagnostics.warn("invalid property 'skipColumns'"),
            }
        }
        if let Some(v) = obj.get("skipInitialSpace") {
            match validate_boolean(v) {
                Some(b) => data.skip_initial_space = b,
                None => diagnostics.warn("invalid property 'skipInitialSpace'"),
            }
        }
        if let Some(v) = obj.get("skipRows") {
            match validate_non_negative_integer(v) {
                Some(n) => data.skip_rows = n,
                None => diagnostics.warn("invalid property 'skipRows'"),
            }
        }
        if let Some(v) = obj.get("trim") {
            match v {
                Json::Bool(true) => data.trim = Trim::True,
                Json::Bool(false) => data.trim = Trim::False,
                Json::String(s) if s == "true" => data.trim = Trim::True,
                Json::String(s) if s == "false" => data.trim = Trim::False,
                Json::String(s) if s == "start" => data.trim = Trim::Start,
                Json::String(s) if s == "end" => data.trim = Trim::End,
                _ => diagnostics.warn("invalid property 'trim'"),
            }
        } else {
            data.trim = if data.skip_initial_space { Trim::Start } else { Trim::False };
        }
    }
    arena.push(parent, NodeKind::Dialect(data))
}

fn build_transformation(
    json: &Json,
    parent: Option<NodeId>,
    arena: &mut Arena,
    diagnostics: &mut Diagnostics,
) -> NodeId {
    let mut data = TransformationData::default();
    if let Some(obj) = json.as_object() {
        match obj.get("url").and_then(|v| v.as_str()) {
            Some(s) => data.url = s.to_string(),
            None => diagnostics.warn("missing required property 'url'"),
        }
        match obj.get("targetFormat").and_then(|v| v.as_str()) {
            Some(s) => data.target_format = s.to_string(),
            None => diagnostics.warn("missing required property 'targetFormat'"),
        }
        match obj.get("scriptFormat").and_then(|v| v.as_str()) {
            Some(s) => data.script_format = s.to_string(),
            None => diagnostics.warn("missing required property 'scriptFormat'"),
        }
        if let Some(v) = obj.get("source") {
            match validate_enum(v, &["json", "rdf"]) {
                Some("json") => data.source = Some(TransformationSource::Json),
                Some("rdf") => data.source = Some(TransformationSource::Rdf),
                _ => diagnostics.warn("invalid property 'source'"),
            }
        }
        if let Some(v) = obj.get("titles") {
            data.titles = normalize_natural_language(v, "und");
        }
    }
    arena.push(parent, NodeKind::Transformation(data))
}

fn apply_table_direction(
    obj: &serde_json::Map<String, Json>,
    diagnostics: &mut Diagnostics,
) -> TableDirection {
    match obj.get("tableDirection") {
        Some(v) => match validate_enum(v, &["rtl", "ltr", "default"]) {
            Some("rtl") => TableDirection::Rtl,
            Some("ltr") => TableDirection::Ltr,
            Some("default") => TableDirection::Default,
            _ => {
                diagnostics.warn("invalid property 'tableDirection'");
                TableDirection::Default
            }
        },
        None => TableDirection::Default,
    }
}

fn build_table(
    json: &Json,
    parent: Option<NodeId>,
    context: &Context,
    arena: &mut Arena,
    diagnostics: &mut Diagnostics,
) -> NodeId {
    let id = arena.push(parent, NodeKind::Table(TableData::default()));
    let mut data = TableData::default();
    if let Some(obj) = json.as_object() {
        match obj.get("url").and_then(|v| v.as_str()) {
            Some(url) => data.url = context.expand_iri(url),
            None => diagnostics.warn("missing required property 'url'"),
        }
        let table_context = context.rebase(&data.url);

        if let Some(schema_json) = obj.get("tableSchema") {
            data.schema = match schema_json {
                Json::Object(_) => Some(build_schema(schema_json, Some(id), &table_context, arena, diagnostics)),
                Json::String(_) => {
                    diagnostics.warn("external schema reference not resolved without a Fetcher");
                    None
                }
                _ => {
                    diagnostics.warn("invalid property 'tableSchema'");
                    None
                }
            };
        }
        if let Some(dialect_json) = obj.get("dialect") {
            data.dialect = Some(build_dialect(dialect_json, Some(id), arena, diagnostics));
        }
        if let Some(Json::Array(items)) = obj.get("transformations") {
            for t in items {
                data.transformations.push(build_transformation(t, Some(id), arena, diagnostics));
            }
        }
        if let Some(Json::Array(notes)) = obj.get("notes") {
            data.notes = notes.clone();
        }
        if let Some(v) = obj.get("suppressOutput") {
            match validate_boolean(v) {
                Some(b) => data.suppress_output = b,
                None => diagnostics.warn("invalid property 'suppressOutput'"),
            }
        }
        data.table_direction = apply_table_direction(obj, diagnostics);
        data.inheritable = build_inheritable(obj, &table_context, diagnostics);
    }
    if let NodeKind::Table(slot) = &mut arena.node_mut(id).kind {
        *slot = data;
    }
    id
}

fn build_table_group(
    json: &Json,
    context: &Context,
    arena: &mut Arena,
    diagnostics: &mut Diagnostics,
) -> NodeId {
    let id = arena.push(None, NodeKind::TableGroup(TableGroupData::default()));
    let mut data = TableGroupData::default();
    if let Some(obj) = json.as_object() {
        if let Some(schema_json) = obj.get("tableSchema") {
            data.schema = match schema_json {
                Json::Object(_) => Some(build_schema(schema_json, Some(id), context, arena, diagnostics)),
                Json::String(_) => {
                    diagnostics.warn("external schema reference not resolved without a Fetcher");
                    None
                }
                _ => {
                    diagnostics.warn("invalid property 'tableSchema'");
                    None
                }
            };
        }
        if let Some(dialect_json) = obj.get("dialect") {
            data.dialect = Some(build_dialect(dialect_json, Some(id), arena, diagnostics));
        }
        if let Some(Json::Array(items)) = obj.get("transformations") {
            for t in items {
                data.transformations.push(build_transformation(t, Some(id), arena, diagnostics));
            }
        }
        if let Some(Json::Array(notes)) = obj.get("notes") {
            data.notes = notes.clone();
        }
        data.table_direction = apply_table_direction(obj, diagnostics);
        data.inheritable = build_inheritable(obj, context, diagnostics);

        if let Some(Json::Array(tables)) = obj.get("tables") {
            for table_json in tables {
                let table_id = build_table(table_json, Some(id), context, arena, diagnostics);
                data.tables.push(table_id);
            }
        } else {
            diagnostics.warn("missing required property 'tables'");
        }
    }
    if let NodeKind::TableGroup(slot) = &mut arena.node_mut(id).kind {
        *slot = data;
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_minimal_group_builds_one_table_and_two_columns() {
        let document = json!({
            "@context": "http://www.w3.org/ns/csvw",
            "tables": [{
                "url": "t.csv",
                "tableSchema": {"columns": [{"name": "name"}, {"name": "age", "datatype": "integer"}]}
            }]
        });
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let NodeKind::TableGroup(group) = &metadata.arena.node(metadata.root).kind else {
            panic!("expected a TableGroup root");
        };
        assert_eq!(group.tables.len(), 1);
        let NodeKind::Table(table) = &metadata.arena.node(group.tables[0]).kind else {
            panic!("expected a Table");
        };
        assert_eq!(table.url, "t.csv");
        let schema_id = table.schema.unwrap();
        let NodeKind::Schema(schema) = &metadata.arena.node(schema_id).kind else {
            panic!("expected a Schema");
        };
        assert_eq!(schema.columns.len(), 2);
    }

    #[test]
    fn parse_bare_table_document_is_wrapped_in_implicit_group() {
        let document = json!({"url": "t.csv"});
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let NodeKind::TableGroup(group) = &metadata.arena.node(metadata.root).kind else {
            panic!("expected an implicit TableGroup root");
        };
        assert_eq!(group.tables.len(), 1);
    }

    #[test]
    fn parse_rejects_non_object_document() {
        let document = json!([1, 2, 3]);
        let mut diagnostics = Diagnostics::new();
        let err = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap_err();
        assert!(matches!(err, CsvwError::Type(_)));
    }

    #[test]
    fn missing_tables_key_records_a_warning_not_a_fatal_error() {
        let document = json!({"@context": "http://www.w3.org/ns/csvw"});
        let mut diagnostics = Diagnostics::new();
        Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        assert!(diagnostics.warnings().iter().any(|w| w.contains("'tables'")));
    }

    #[test]
    fn invalid_delimiter_reverts_to_default_with_a_warning() {
        let document = json!({
            "tables": [{"url": "t.csv", "dialect": {"delimiter": "not-one-char"}}]
        });
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let NodeKind::TableGroup(group) = &metadata.arena.node(metadata.root).kind else { unreachable!() };
        let NodeKind::Table(table) = &metadata.arena.node(group.tables[0]).kind else { unreachable!() };
        let NodeKind::Dialect(dialect) = &metadata.arena.node(table.dialect.unwrap()).kind else { unreachable!() };
        assert_eq!(dialect.delimiter, ',');
        assert!(diagnostics.warnings().iter().any(|w| w.contains("'delimiter'")));
    }

    #[test]
    fn foreign_key_rejects_both_resource_and_schema_reference() {
        let fk = json!({
            "columnReference": "id",
            "reference": {"resource": "other.csv", "schemaReference": "x", "columnReference": "id"}
        });
        let mut diagnostics = Diagnostics::new();
        assert!(build_foreign_key(&fk, &mut diagnostics).is_none());
        assert!(diagnostics.warnings().iter().any(|w| w.contains("mutually exclusive")));
    }
}
