//! Annotated-model builders (C7, `spec.md` §4.5): `to_atd()` renders a
//! metadata node, or a row/cell produced while iterating a table, into
//! the plain JSON map form downstream RDF/JSON emitters consume.
//!
//! Grounded on the teacher's `Schema::to_yaml_value` canonicalization
//! pass (stable key ordering, drop-empty-and-null), retargeted from YAML
//! to `serde_json::Value` via `preserve_order` (`Cargo.toml`).

use serde_json::{Map, Value as Json, json};

use crate::cell::{Cell, CellData};
use crate::metadata::node::{Arena, NodeId, NodeKind, TransformationSource};
use crate::metadata::parse::Metadata;
use crate::rows::Row;
use crate::value::CellValue;

fn push(map: &mut Map<String, Json>, key: &str, value: Json) {
    let omit = match &value {
        Json::Null => true,
        Json::String(s) => s.is_empty(),
        Json::Array(items) => items.is_empty(),
        Json::Object(obj) => obj.is_empty(),
        _ => false,
    };
    if !omit {
        map.insert(key.to_string(), value);
    }
}

fn titles_to_json(titles: &crate::metadata::node::LanguageMap) -> Json {
    let mut map = Map::new();
    for (lang, values) in titles {
        map.insert(lang.clone(), json!(values));
    }
    Json::Object(map)
}

/// `Metadata::to_atd() -> map` (`spec.md` §6), starting from the parsed
/// document's root node.
pub fn metadata_to_atd(metadata: &Metadata) -> Json {
    node_to_atd(&metadata.arena, metadata.root)
}

/// Renders a single node (any kind) of the metadata arena to its ATD JSON
/// form. Exposed at `pub(crate)` so the `probe` CLI command can render a
/// bare extracted `Table` node without a surrounding `TableGroup`.
pub(crate) fn node_to_atd(arena: &Arena, id: NodeId) -> Json {
    let node = arena.node(id);
    match &node.kind {
        NodeKind::TableGroup(group) => {
            let mut map = Map::new();
            push(&mut map, "@type", json!("TableGroup"));
            push(
                &mut map,
                "tables",
                Json::Array(group.tables.iter().map(|&t| node_to_atd(arena, t)).collect()),
            );
            push_inheritable(&mut map, &group.inheritable);
            push(&mut map, "notes", Json::Array(group.notes.clone()));
            map.into()
        }
        NodeKind::Table(table) => {
            let mut map = Map::new();
            push(&mut map, "@type", json!("Table"));
            push(&mut map, "url", json!(table.url));
            if let Some(schema_id) = table.schema {
                push(&mut map, "tableSchema", node_to_atd(arena, schema_id));
            }
            push(&mut map, "suppressOutput", json!(table.suppress_output));
            push_inheritable(&mut map, &table.inheritable);
            push(&mut map, "notes", Json::Array(table.notes.clone()));
            map.into()
        }
        NodeKind::Schema(schema) => {
            let mut map = Map::new();
            push(&mut map, "@type", json!("Schema"));
            if let Some(id) = &schema.id {
                push(&mut map, "@id", json!(id));
            }
            push(
                &mut map,
                "columns",
                Json::Array(schema.columns.iter().map(|&c| node_to_atd(arena, c)).collect()),
            );
            push(&mut map, "primaryKey", json!(schema.primary_key));
            push_inheritable(&mut map, &schema.inheritable);
            map.into()
        }
        NodeKind::Column(column) => {
            let mut map = Map::new();
            push(&mut map, "@type", json!("Column"));
            push(&mut map, "number", json!(column.number));
            if let Some(name) = &column.name {
                push(&mut map, "name", json!(name));
            }
            push(&mut map, "titles", titles_to_json(&column.titles));
            push(&mut map, "virtual", json!(column.virtual_));
            push(&mut map, "suppressOutput", json!(column.suppress_output));
            push_inheritable(&mut map, &column.inheritable);
            map.into()
        }
        NodeKind::Dialect(dialect) => {
            let mut map = Map::new();
            push(&mut map, "@type", json!("Dialect"));
            push(&mut map, "delimiter", json!(dialect.delimiter.to_string()));
            push(&mut map, "header", json!(dialect.header));
            push(&mut map, "headerRowCount", json!(dialect.header_row_count));
            map.into()
        }
        NodeKind::Transformation(transformation) => {
            let mut map = Map::new();
            push(&mut map, "@type", json!("Transformation"));
            push(&mut map, "url", json!(transformation.url));
            push(&mut map, "targetFormat", json!(transformation.target_format));
            push(&mut map, "scriptFormat", json!(transformation.script_format));
            if let Some(source) = &transformation.source {
                push(
                    &mut map,
                    "source",
                    json!(match source {
                        TransformationSource::Json => "json",
                        TransformationSource::Rdf => "rdf",
                    }),
                );
            }
            push(&mut map, "titles", titles_to_json(&transformation.titles));
            map.into()
        }
        NodeKind::Datatype(decl) => {
            let mut map = Map::new();
            push(&mut map, "@type", json!("Datatype"));
            push(&mut map, "base", json!(decl.base));
            map.into()
        }
    }
}

fn push_inheritable(map: &mut Map<String, Json>, inh: &crate::metadata::node::Inheritable) {
    if let Some(v) = &inh.about_url {
        push(map, "aboutUrl", json!(v));
    }
    if let Some(v) = &inh.property_url {
        push(map, "propertyUrl", json!(v));
    }
    if let Some(v) = &inh.value_url {
        push(map, "valueUrl", json!(v));
    }
    if let Some(v) = &inh.default {
        push(map, "default", json!(v));
    }
    if let Some(v) = &inh.lang {
        push(map, "lang", json!(v));
    }
    if let Some(v) = inh.required {
        push(map, "required", json!(v));
    }
}

/// Renders a cell value to its JSON-native form for the annotated model.
fn cell_value_to_json(value: &CellValue) -> Json {
    match value {
        CellValue::String { value, lang } => match lang {
            Some(lang) if lang != "und" => json!({"@value": value, "@language": lang}),
            _ => json!(value),
        },
        CellValue::Number(n) => serde_json::from_str::<serde_json::Number>(&n.to_string())
            .ok()
            .map(Json::Number)
            .unwrap_or_else(|| json!(n.to_string())),
        CellValue::Boolean(b) => json!(b),
        CellValue::Date { canonical, .. } => json!(canonical),
        CellValue::DateTime { canonical, .. } => json!(canonical),
        CellValue::Time { canonical, .. } => json!(canonical),
        CellValue::Duration(s) => json!(s),
        CellValue::Literal { lexical, datatype_iri } => json!({"@value": lexical, "@type": datatype_iri}),
    }
}

/// Renders one interpreted [`Cell`] (`spec.md` §3 "Cell" / §4.5).
pub fn cell_to_atd(arena: &Arena, cell: &Cell) -> Json {
    let mut map = Map::new();
    push(&mut map, "@type", json!("Cell"));
    if let NodeKind::Column(column) = &arena.node(cell.column).kind
        && let Some(name) = &column.name
    {
        push(&mut map, "column", json!(name));
    }
    push(&mut map, "stringValue", json!(cell.string_value));
    let value = match &cell.value {
        CellData::Single(Some(v)) => cell_value_to_json(v),
        CellData::Single(None) => Json::Null,
        CellData::List(items) => Json::Array(
            items
                .iter()
                .map(|v| v.as_ref().map(cell_value_to_json).unwrap_or(Json::Null))
                .collect(),
        ),
    };
    map.insert("value".to_string(), value);
    if let Some(v) = &cell.about_url {
        push(&mut map, "aboutUrl", json!(v));
    }
    if let Some(v) = &cell.property_url {
        push(&mut map, "propertyUrl", json!(v));
    }
    if let Some(v) = &cell.value_url {
        push(&mut map, "valueUrl", json!(v));
    }
    push(&mut map, "errors", json!(cell.errors));
    map.into()
}

/// Renders one [`Row`] (`spec.md` §3 "Row" / §4.5).
pub fn row_to_atd(arena: &Arena, row: &Row) -> Json {
    let mut map = Map::new();
    push(&mut map, "@type", json!("Row"));
    push(&mut map, "number", json!(row.number));
    push(&mut map, "sourceNumber", json!(row.source_number));
    push(
        &mut map,
        "cells",
        Json::Array(row.cells.iter().map(|c| cell_to_atd(arena, c)).collect()),
    );
    map.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;
    use crate::metadata::parse::ParseOptions;
    use serde_json::json as j;

    #[test]
    fn table_group_atd_drops_empty_notes_and_nests_tables() {
        let document = j!({"tables": [{"url": "t.csv"}]});
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let atd = metadata_to_atd(&metadata);
        assert_eq!(atd["@type"], j!("TableGroup"));
        assert!(atd.get("notes").is_none());
        assert_eq!(atd["tables"][0]["url"], j!("t.csv"));
    }

    #[test]
    fn cell_atd_carries_column_name_and_value() {
        let document = j!({
            "tables": [{"url": "t.csv", "tableSchema": {"columns": [{"name": "age", "datatype": "integer"}]}}]
        });
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let schema_id = {
            let NodeKind::TableGroup(group) = &metadata.arena.node(metadata.root).kind else { unreachable!() };
            let NodeKind::Table(table) = &metadata.arena.node(group.tables[0]).kind else { unreachable!() };
            table.schema.unwrap()
        };
        let context = crate::context::Context::with_base(url::Url::parse("http://example.org/t.csv").unwrap());
        let cells = crate::cell::interpret_row(&metadata, schema_id, &["30".to_string()], 1, 1, &context);
        let atd = cell_to_atd(&metadata.arena, &cells[0]);
        assert_eq!(atd["column"], j!("age"));
        assert_eq!(atd["value"], j!(30));
    }
}
