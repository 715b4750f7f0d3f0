//! Dialect extractor (C4, `spec.md` §4.2): builds a `Table` metadata node
//! directly from a CSV header, for the common case where no metadata
//! document accompanies the file.

use std::io::Read;

use crate::error::Result;
use crate::io_utils::open_dialect_reader;
use crate::metadata::node::{Arena, ColumnData, DialectData, NodeId, NodeKind, SchemaData, TableData};

/// The result of extracting embedded metadata: the `Table` node plus any
/// comment rows encountered while skipping `skipRows` rows.
pub struct ExtractedTable {
    pub arena: Arena,
    pub table: NodeId,
    pub comments: Vec<String>,
}

/// `Dialect::embedded_metadata(stream, options) -> Table` (`spec.md` §6).
pub fn embedded_metadata<R: Read>(reader: R, dialect: &DialectData, url: &str) -> Result<ExtractedTable> {
    let mut csv_reader =
        open_dialect_reader(reader, dialect).map_err(|err| crate::error::CsvwError::Other(err.to_string()))?;
    let mut comments = Vec::new();
    let mut record = csv::StringRecord::new();

    for _ in 0..dialect.skip_rows {
        if !csv_reader.read_record(&mut record)? {
            break;
        }
        let joined = record.iter().collect::<Vec<_>>().join(&dialect.delimiter.to_string());
        let trimmed = dialect.trim.apply(&joined);
        if let Some(prefix) = dialect.comment_prefix
            && let Some(suffix) = trimmed.strip_prefix(prefix)
        {
            comments.push(suffix.trim().to_string());
        }
    }

    let mut arena = Arena::new();
    let table_id = arena.push(None, NodeKind::Table(TableData::default()));
    let schema_id = arena.push(Some(table_id), NodeKind::Schema(SchemaData::default()));
    let mut columns: Vec<NodeId> = Vec::new();

    for _ in 0..dialect.header_row_count {
        if !csv_reader.read_record(&mut record)? {
            break;
        }
        for (index, field) in record.iter().enumerate().skip(dialect.skip_columns) {
            let column_index = index - dialect.skip_columns;
            if column_index >= columns.len() {
                let column_id = arena.push(Some(schema_id), NodeKind::Column(ColumnData::default()));
                columns.push(column_id);
            }
            let trimmed = dialect.trim.apply(field).to_string();
            if let NodeKind::Column(column) = &mut arena.node_mut(columns[column_index]).kind {
                column.number = column_index + 1;
                column.titles.entry("und".to_string()).or_default().push(trimmed);
            }
        }
    }

    if let NodeKind::Schema(schema) = &mut arena.node_mut(schema_id).kind {
        schema.columns = columns;
    }
    if let NodeKind::Table(table) = &mut arena.node_mut(table_id).kind {
        table.url = url.to_string();
        table.schema = Some(schema_id);
    }

    Ok(ExtractedTable { arena, table: table_id, comments })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_column_titles_from_a_single_header_row() {
        let data = b"name,age\nAlice,30\n";
        let extracted = embedded_metadata(&data[..], &DialectData::default(), "t.csv").unwrap();
        let NodeKind::Table(table) = &extracted.arena.node(extracted.table).kind else { unreachable!() };
        let NodeKind::Schema(schema) = &extracted.arena.node(table.schema.unwrap()).kind else { unreachable!() };
        assert_eq!(schema.columns.len(), 2);
        let NodeKind::Column(first) = &extracted.arena.node(schema.columns[0]).kind else { unreachable!() };
        assert_eq!(first.titles.get("und"), Some(&vec!["name".to_string()]));
    }

    #[test]
    fn records_a_skipped_comment_row_per_scenario_s2() {
        let dialect = DialectData { skip_rows: 1, header_row_count: 1, ..DialectData::default() };
        let data = b"#hello\nname\nAlice\n";
        let extracted = embedded_metadata(&data[..], &dialect, "t.csv").unwrap();
        assert_eq!(extracted.comments, vec!["hello".to_string()]);
    }

    #[test]
    fn skips_leading_columns_per_skip_columns() {
        let dialect = DialectData { skip_columns: 1, ..DialectData::default() };
        let data = b"ignored,name,age\nx,Alice,30\n";
        let extracted = embedded_metadata(&data[..], &dialect, "t.csv").unwrap();
        let NodeKind::Table(table) = &extracted.arena.node(extracted.table).kind else { unreachable!() };
        let NodeKind::Schema(schema) = &extracted.arena.node(table.schema.unwrap()).kind else { unreachable!() };
        assert_eq!(schema.columns.len(), 2);
        let NodeKind::Column(first) = &extracted.arena.node(schema.columns[0]).kind else { unreachable!() };
        assert_eq!(first.titles.get("und"), Some(&vec!["name".to_string()]));
    }
}
