//! Row iterator (C5, `spec.md` §4.3): drives a dialect-aware CSV reader
//! over a table's data rows, routing comments to annotations and
//! handing each data row to the cell interpreter (C6).
//!
//! Grounded on the teacher's `rows.rs::parse_typed_row`, generalized from
//! a fixed schema-driven row parse to the full skip/comment/blank-row
//! bookkeeping `spec.md` requires.

use std::io::Read;

use crate::cell::{self, Cell};
use crate::context::Context;
use crate::error::{CsvwError, Result, RowWidthError};
use crate::io_utils::open_dialect_reader;
use crate::metadata::node::{DialectData, NodeId, NodeKind};
use crate::metadata::parse::Metadata;

/// One event yielded by [`each_row`]: either a fully interpreted data
/// row, or a comment line annotated onto the table (`spec.md` §4.3).
pub enum RowEvent {
    Row(Row),
    Comment(String),
}

/// `spec.md` §3 "Row": `number` is the 1-based logical row index;
/// `source_number` is the 1-based physical line it came from.
pub struct Row {
    pub number: usize,
    pub source_number: usize,
    pub table: NodeId,
    pub cells: Vec<Cell>,
}

fn resolve_dialect(metadata: &Metadata, table_id: NodeId) -> DialectData {
    let arena = &metadata.arena;
    let mut current = Some(table_id);
    while let Some(id) = current {
        let dialect_id = match &arena.node(id).kind {
            NodeKind::Table(table) => table.dialect,
            NodeKind::TableGroup(group) => group.dialect,
            _ => None,
        };
        if let Some(dialect_id) = dialect_id
            && let NodeKind::Dialect(dialect) = &arena.node(dialect_id).kind
        {
            return dialect.clone();
        }
        current = arena.node(id).parent;
    }
    DialectData::default()
}

fn non_virtual_column_count(metadata: &Metadata, schema_id: NodeId) -> usize {
    let arena = &metadata.arena;
    let NodeKind::Schema(schema) = &arena.node(schema_id).kind else { return 0 };
    schema
        .columns
        .iter()
        .filter(|&&id| !matches!(&arena.node(id).kind, NodeKind::Column(c) if c.virtual_))
        .count()
}

/// `Metadata::each_row(stream, sink)` (`spec.md` §6): drives `reader`
/// with `table_id`'s resolved dialect, calling `sink` once per
/// [`RowEvent`]. Row-width violations are fatal (`spec.md` §7); per-cell
/// datatype/facet errors are collected on each [`Cell`] and never abort
/// iteration.
pub fn each_row<R, F>(metadata: &Metadata, table_id: NodeId, reader: R, mut sink: F) -> Result<()>
where
    R: Read,
    F: FnMut(RowEvent) -> Result<()>,
{
    let arena = &metadata.arena;
    let NodeKind::Table(table) = &arena.node(table_id).kind else {
        return Err(CsvwError::Other("each_row requires a Table node".to_string()));
    };
    let schema_id = table.schema;
    let table_url = table.url.clone();
    let dialect = resolve_dialect(metadata, table_id);
    let non_virtual = schema_id.map(|id| non_virtual_column_count(metadata, id)).unwrap_or(0);
    let table_context = Context::with_base(
        url::Url::parse(&table_url).unwrap_or_else(|_| url::Url::parse("file:///").unwrap()),
    );

    let mut csv_reader =
        open_dialect_reader(reader, &dialect).map_err(|err| CsvwError::Other(err.to_string()))?;
    let mut record = csv::StringRecord::new();

    // `skipRows` + `headerRowCount` physical rows must be consumed before
    // data rows begin, but a comment (or blank, under `skipBlankRows`) row
    // encountered in that phase is routed the same way it would be in the
    // data phase: it does not count against the skip/header budget, but it
    // does count toward `skipped` so the first data row's `sourceNumber`
    // accounts for every physical row that preceded it (`spec.md` §4.3,
    // §8 property 6).
    let skip_header_target = dialect.skip_rows + dialect.header_row_count;
    let mut consumed = 0usize;
    let mut skipped = 0usize;

    while consumed < skip_header_target {
        if !csv_reader.read_record(&mut record)? {
            return Ok(());
        }
        let fields: Vec<&str> = record.iter().collect();
        let joined = fields.join(&dialect.delimiter.to_string());
        let trimmed = dialect.trim.apply(&joined);

        if let Some(prefix) = dialect.comment_prefix
            && let Some(suffix) = trimmed.strip_prefix(prefix)
        {
            skipped += 1;
            sink(RowEvent::Comment(suffix.trim().to_string()))?;
            continue;
        }

        if dialect.skip_blank_rows && fields.iter().all(|f| dialect.trim.apply(f).is_empty()) {
            skipped += 1;
            continue;
        }

        consumed += 1;
        skipped += 1;
    }

    let mut number = 0usize;

    while csv_reader.read_record(&mut record)? {
        let fields: Vec<&str> = record.iter().collect();
        let joined = fields.join(&dialect.delimiter.to_string());
        let trimmed = dialect.trim.apply(&joined);

        if let Some(prefix) = dialect.comment_prefix
            && let Some(suffix) = trimmed.strip_prefix(prefix)
        {
            skipped += 1;
            sink(RowEvent::Comment(suffix.trim().to_string()))?;
            continue;
        }

        if dialect.skip_blank_rows && fields.iter().all(|f| dialect.trim.apply(f).is_empty()) {
            skipped += 1;
            continue;
        }

        number += 1;
        let source_number = number + skipped;

        let data_fields: Vec<&str> = record.iter().skip(dialect.skip_columns).collect();
        if data_fields.len() < non_virtual {
            return Err(CsvwError::RowWidth(RowWidthError {
                source_number,
                expected: non_virtual,
                found: data_fields.len(),
            }));
        }

        let cells = match schema_id {
            Some(schema_id) => {
                let raw = build_raw_columns(metadata, schema_id, &data_fields);
                cell::interpret_row(metadata, schema_id, &raw, number, source_number, &table_context)
            }
            None => Vec::new(),
        };

        sink(RowEvent::Row(Row { number, source_number, table: table_id, cells }))?;
    }

    Ok(())
}

/// Aligns raw data fields to schema column order: non-virtual columns
/// consume fields in order; virtual columns (which never have a source
/// cell) get an empty string, letting the cell interpreter's default
/// substitution take over (`spec.md` §4.3, §4.4 step 2).
fn build_raw_columns(metadata: &Metadata, schema_id: NodeId, data_fields: &[&str]) -> Vec<String> {
    let arena = &metadata.arena;
    let NodeKind::Schema(schema) = &arena.node(schema_id).kind else { return Vec::new() };
    let mut field_iter = data_fields.iter();
    schema
        .columns
        .iter()
        .map(|&column_id| match &arena.node(column_id).kind {
            NodeKind::Column(c) if c.virtual_ => String::new(),
            _ => field_iter.next().map(|s| s.to_string()).unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;
    use crate::metadata::node::NodeKind;
    use crate::metadata::parse::{Metadata, ParseOptions};
    use serde_json::json;

    fn table_id(metadata: &Metadata) -> NodeId {
        match &metadata.arena.node(metadata.root).kind {
            NodeKind::TableGroup(group) => group.tables[0],
            _ => metadata.root,
        }
    }

    #[test]
    fn minimal_group_row_numbering_matches_scenario_s1() {
        let document = json!({"tables": [{"url": "t.csv", "tableSchema": {"columns": [{"name": "name"}, {"name": "age"}]}}]});
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let data = b"name,age\nAlice,30\nBob,25\n";
        let mut rows = Vec::new();
        each_row(&metadata, table_id(&metadata), &data[..], |event| {
            if let RowEvent::Row(row) = event {
                rows.push((row.number, row.source_number));
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(rows, vec![(1, 2), (2, 3)]);
    }

    #[test]
    fn comment_rows_are_routed_to_annotations_per_scenario_s2() {
        let document = json!({
            "tables": [{
                "url": "t.csv",
                "dialect": {"commentPrefix": "#", "skipRows": 0},
                "tableSchema": {"columns": [{"name": "name"}]}
            }]
        });
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let data = b"#hello\nname\nAlice\n";
        let mut comments = Vec::new();
        let mut rows = Vec::new();
        each_row(&metadata, table_id(&metadata), &data[..], |event| {
            match event {
                RowEvent::Comment(text) => comments.push(text),
                RowEvent::Row(row) => rows.push((row.number, row.source_number)),
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(comments, vec!["hello".to_string()]);
        assert_eq!(rows, vec![(1, 3)]);
    }

    #[test]
    fn row_width_error_is_fatal() {
        let document = json!({
            "tables": [{"url": "t.csv", "tableSchema": {"columns": [{"name": "a"}, {"name": "b"}]}}]
        });
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let data = b"a,b\nonly-one\n";
        let result = each_row(&metadata, table_id(&metadata), &data[..], |_| Ok(()));
        assert!(result.is_err());
    }

    #[test]
    fn virtual_trailing_column_is_filled_from_default() {
        let document = json!({
            "tables": [{"url": "t.csv", "tableSchema": {"columns": [
                {"name": "a"},
                {"name": "b", "virtual": true, "default": "zz"}
            ]}}]
        });
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let data = b"a\nfirst\n";
        let mut seen = Vec::new();
        each_row(&metadata, table_id(&metadata), &data[..], |event| {
            if let RowEvent::Row(row) = event {
                seen.push(row.cells.len());
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![2]);
    }
}
