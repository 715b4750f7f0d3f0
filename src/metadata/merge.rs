//! Merge semantics (`spec.md` §4.1 "Merge", `verify_compatible!`).
//!
//! `self` is the primary side (typically user-supplied metadata); `other`
//! is the secondary side (typically metadata the dialect extractor built
//! from a CSV header). Scalars/links keep the primary's value unless
//! absent; arrays union; natural-language maps concatenate per language
//! then drop `und` duplicates. The two input arenas are never mutated —
//! every merge builds a fresh third [`Arena`].

use crate::error::MergeError;
use crate::metadata::node::{
    Arena, ColumnData, ForeignKey, Inheritable, LanguageMap, NodeId, NodeKind, SchemaData, TableData,
    TableGroupData, TransformationData,
};
use crate::metadata::parse::Metadata;
use crate::metadata::property::dedupe_und;

impl Metadata {
    /// `Metadata::merge(other) -> Metadata` (`spec.md` §6).
    pub fn merge(&self, other: &Metadata) -> Result<Metadata, MergeError> {
        let mut out = Arena::new();
        let root = match (&self.arena.node(self.root).kind, &other.arena.node(other.root).kind) {
            (NodeKind::TableGroup(a), NodeKind::TableGroup(b)) => {
                merge_table_group(&self.arena, a, &other.arena, b, &mut out)?
            }
            (NodeKind::Table(a), NodeKind::Table(b)) if a.url == b.url => {
                merge_table(&self.arena, a, &other.arena, b, None, &mut out)?
            }
            (left, right) => {
                return Err(MergeError::IncompatibleClasses {
                    left: left.type_name(),
                    right: right.type_name(),
                });
            }
        };
        out.root = Some(root);
        Ok(Metadata { arena: out, root, context: self.context.clone() })
    }

    /// `Metadata::verify_compatible!(other) -> () | MergeError` (`spec.md`
    /// §6), used when checking embedded (CSV-header-derived) metadata
    /// against user-supplied metadata without actually merging. Each side
    /// may be a bare Table (as `Dialect::embedded_metadata` produces) or
    /// a single-table TableGroup (as a full metadata document parses to).
    pub fn verify_compatible(&self, other: &Metadata) -> Result<(), MergeError> {
        let (Some((self_arena, self_table_id)), Some((other_arena, other_table_id))) =
            (effective_table(&self.arena, self.root), effective_table(&other.arena, other.root))
        else {
            return Err(MergeError::IncompatibleClasses {
                left: self.arena.node(self.root).kind.type_name(),
                right: other.arena.node(other.root).kind.type_name(),
            });
        };
        let NodeKind::Table(user) = &self_arena.node(self_table_id).kind else { unreachable!() };
        let NodeKind::Table(embedded) = &other_arena.node(other_table_id).kind else { unreachable!() };
        if user.url != embedded.url {
            return Err(MergeError::UrlMismatch { user: user.url.clone(), embedded: embedded.url.clone() });
        }
        let (Some(user_schema_id), Some(embedded_schema_id)) = (user.schema, embedded.schema) else {
            return Ok(());
        };
        let NodeKind::Schema(user_schema) = &self_arena.node(user_schema_id).kind else { return Ok(()) };
        let NodeKind::Schema(embedded_schema) = &other_arena.node(embedded_schema_id).kind else {
            return Ok(());
        };
        let non_virtual: Vec<NodeId> = user_schema
            .columns
            .iter()
            .copied()
            .filter(|&id| !matches!(&self_arena.node(id).kind, NodeKind::Column(c) if c.virtual_))
            .collect();
        if non_virtual.len() != embedded_schema.columns.len() {
            return Err(MergeError::ColumnCountMismatch {
                non_virtual: non_virtual.len(),
                embedded: embedded_schema.columns.len(),
            });
        }
        for (index, (&user_col_id, &embedded_col_id)) in
            non_virtual.iter().zip(embedded_schema.columns.iter()).enumerate()
        {
            let NodeKind::Column(user_col) = &self_arena.node(user_col_id).kind else { continue };
            let NodeKind::Column(embedded_col) = &other_arena.node(embedded_col_id).kind else { continue };
            if !columns_match(user_col, embedded_col) {
                return Err(MergeError::UnresolvableColumn { index });
            }
        }
        Ok(())
    }
}

/// Resolves the single Table a piece of Table-level metadata represents,
/// whether `root` is a bare Table or a single-table TableGroup wrapper.
fn effective_table(arena: &Arena, root: NodeId) -> Option<(&Arena, NodeId)> {
    match &arena.node(root).kind {
        NodeKind::Table(_) => Some((arena, root)),
        NodeKind::TableGroup(group) if group.tables.len() == 1 => Some((arena, group.tables[0])),
        _ => None,
    }
}

fn merge_inheritable(a: &Inheritable, b: &Inheritable) -> Inheritable {
    Inheritable {
        about_url: a.about_url.clone().or_else(|| b.about_url.clone()),
        property_url: a.property_url.clone().or_else(|| b.property_url.clone()),
        value_url: a.value_url.clone().or_else(|| b.value_url.clone()),
        datatype: a.datatype.clone().or_else(|| b.datatype.clone()),
        default: a.default.clone().or_else(|| b.default.clone()),
        lang: a.lang.clone().or_else(|| b.lang.clone()),
        null: a.null.clone().or_else(|| b.null.clone()),
        ordered: a.ordered.or(b.ordered),
        required: a.required.or(b.required),
        separator: a.separator.clone().or_else(|| b.separator.clone()),
        text_direction: a.text_direction.or(b.text_direction),
    }
}

fn merge_titles(a: &LanguageMap, b: &LanguageMap) -> LanguageMap {
    let mut merged = a.clone();
    for (lang, values) in b {
        let entry = merged.entry(lang.clone()).or_default();
        for value in values {
            if !entry.contains(value) {
                entry.push(value.clone());
            }
        }
    }
    dedupe_und(&mut merged);
    merged
}

fn fold(s: &str) -> String {
    s.to_ascii_lowercase()
}

fn columns_match(a: &ColumnData, b: &ColumnData) -> bool {
    if let (Some(a_name), Some(b_name)) = (&a.name, &b.name) {
        return a_name == b_name;
    }
    for (a_lang, a_values) in &a.titles {
        for (b_lang, b_values) in &b.titles {
            let lang_compatible = a_lang == "und" || b_lang == "und" || fold(a_lang) == fold(b_lang);
            if lang_compatible && a_values.iter().any(|v| b_values.contains(v)) {
                return true;
            }
        }
    }
    false
}

fn copy_column(arena: &Arena, id: NodeId, parent: Option<NodeId>, out: &mut Arena) -> NodeId {
    let NodeKind::Column(data) = &arena.node(id).kind else { unreachable!("expected Column") };
    out.push(parent, NodeKind::Column(data.clone()))
}

fn merge_column(
    arena_a: &Arena,
    a_id: NodeId,
    arena_b: &Arena,
    b_id: NodeId,
    parent: Option<NodeId>,
    out: &mut Arena,
) -> NodeId {
    let NodeKind::Column(a) = &arena_a.node(a_id).kind else { unreachable!("expected Column") };
    let NodeKind::Column(b) = &arena_b.node(b_id).kind else { unreachable!("expected Column") };
    let merged = ColumnData {
        number: a.number,
        name: a.name.clone().or_else(|| b.name.clone()),
        titles: merge_titles(&a.titles, &b.titles),
        virtual_: a.virtual_,
        suppress_output: a.suppress_output,
        inheritable: merge_inheritable(&a.inheritable, &b.inheritable),
    };
    out.push(parent, NodeKind::Column(merged))
}

fn merge_schema(
    arena_a: &Arena,
    a: &SchemaData,
    arena_b: &Arena,
    b: &SchemaData,
    parent: Option<NodeId>,
    out: &mut Arena,
) -> Result<NodeId, MergeError> {
    let id = out.push(parent, NodeKind::Schema(SchemaData::default()));

    let non_virtual: Vec<(usize, NodeId)> = a
        .columns
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, cid)| !matches!(&arena_a.node(cid).kind, NodeKind::Column(c) if c.virtual_))
        .collect();

    if non_virtual.len() != b.columns.len() {
        return Err(MergeError::ColumnCountMismatch { non_virtual: non_virtual.len(), embedded: b.columns.len() });
    }

    let mut merged_by_a_index: std::collections::HashMap<usize, NodeId> = std::collections::HashMap::new();
    for (b_index, (a_index, a_col_id)) in non_virtual.iter().enumerate() {
        let b_col_id = b.columns[b_index];
        let NodeKind::Column(a_col) = &arena_a.node(*a_col_id).kind else { continue };
        let NodeKind::Column(b_col) = &arena_b.node(b_col_id).kind else { continue };
        if columns_match(a_col, b_col) {
            let merged_id = merge_column(arena_a, *a_col_id, arena_b, b_col_id, Some(id), out);
            merged_by_a_index.insert(*a_index, merged_id);
        } else {
            return Err(MergeError::UnresolvableColumn { index: b_index });
        }
    }

    let mut columns = Vec::with_capacity(a.columns.len());
    for (index, &a_col_id) in a.columns.iter().enumerate() {
        if let Some(&merged_id) = merged_by_a_index.get(&index) {
            columns.push(merged_id);
        } else {
            columns.push(copy_column(arena_a, a_col_id, Some(id), out));
        }
    }

    let mut foreign_keys: Vec<ForeignKey> = a.foreign_keys.clone();
    for fk in &b.foreign_keys {
        if !foreign_keys.iter().any(|existing| format!("{existing:?}") == format!("{fk:?}")) {
            foreign_keys.push(fk.clone());
        }
    }

    let merged_data = SchemaData {
        id: a.id.clone().or_else(|| b.id.clone()),
        columns,
        primary_key: if a.primary_key.is_empty() { b.primary_key.clone() } else { a.primary_key.clone() },
        foreign_keys,
        inheritable: merge_inheritable(&a.inheritable, &b.inheritable),
    };
    if let NodeKind::Schema(slot) = &mut out.node_mut(id).kind {
        *slot = merged_data;
    }
    Ok(id)
}

fn merge_schema_opt(
    arena_a: &Arena,
    a: Option<NodeId>,
    arena_b: &Arena,
    b: Option<NodeId>,
    parent: Option<NodeId>,
    out: &mut Arena,
) -> Result<Option<NodeId>, MergeError> {
    match (a, b) {
        (None, None) => Ok(None),
        (Some(a_id), None) => Ok(Some(copy_schema(arena_a, a_id, parent, out))),
        (None, Some(b_id)) => Ok(Some(copy_schema(arena_b, b_id, parent, out))),
        (Some(a_id), Some(b_id)) => {
            let NodeKind::Schema(a_data) = &arena_a.node(a_id).kind else { unreachable!() };
            let NodeKind::Schema(b_data) = &arena_b.node(b_id).kind else { unreachable!() };
            merge_schema(arena_a, a_data, arena_b, b_data, parent, out).map(Some)
        }
    }
}

fn copy_schema(arena: &Arena, id: NodeId, parent: Option<NodeId>, out: &mut Arena) -> NodeId {
    let NodeKind::Schema(data) = &arena.node(id).kind else { unreachable!("expected Schema") };
    let new_id = out.push(parent, NodeKind::Schema(SchemaData::default()));
    let columns = data.columns.iter().map(|&cid| copy_column(arena, cid, Some(new_id), out)).collect();
    let mut copied = data.clone();
    copied.columns = columns;
    if let NodeKind::Schema(slot) = &mut out.node_mut(new_id).kind {
        *slot = copied;
    }
    new_id
}

fn copy_dialect(arena: &Arena, id: NodeId, parent: Option<NodeId>, out: &mut Arena) -> NodeId {
    let NodeKind::Dialect(data) = &arena.node(id).kind else { unreachable!("expected Dialect") };
    out.push(parent, NodeKind::Dialect(data.clone()))
}

fn merge_dialect_opt(
    arena_a: &Arena,
    a: Option<NodeId>,
    arena_b: &Arena,
    b: Option<NodeId>,
    parent: Option<NodeId>,
    out: &mut Arena,
) -> Option<NodeId> {
    match (a, b) {
        (Some(a_id), _) => Some(copy_dialect(arena_a, a_id, parent, out)),
        (None, Some(b_id)) => Some(copy_dialect(arena_b, b_id, parent, out)),
        (None, None) => None,
    }
}

fn copy_transformation(arena: &Arena, id: NodeId, parent: Option<NodeId>, out: &mut Arena) -> NodeId {
    let NodeKind::Transformation(data) = &arena.node(id).kind else { unreachable!("expected Transformation") };
    out.push(parent, NodeKind::Transformation(data.clone()))
}

fn merge_transformations(
    arena_a: &Arena,
    a: &[NodeId],
    arena_b: &Arena,
    b: &[NodeId],
    parent: Option<NodeId>,
    out: &mut Arena,
) -> Vec<NodeId> {
    let key = |d: &TransformationData| (d.target_format.clone(), d.script_format.clone());
    let mut result = Vec::new();
    let mut seen_keys = std::collections::HashSet::new();
    for &id in a {
        let NodeKind::Transformation(data) = &arena_a.node(id).kind else { continue };
        seen_keys.insert(key(data));
        result.push(copy_transformation(arena_a, id, parent, out));
    }
    for &id in b {
        let NodeKind::Transformation(data) = &arena_b.node(id).kind else { continue };
        if seen_keys.insert(key(data)) {
            result.push(copy_transformation(arena_b, id, parent, out));
        }
    }
    result
}

fn merge_table(
    arena_a: &Arena,
    a: &TableData,
    arena_b: &Arena,
    b: &TableData,
    parent: Option<NodeId>,
    out: &mut Arena,
) -> Result<NodeId, MergeError> {
    let id = out.push(parent, NodeKind::Table(TableData::default()));
    let schema = merge_schema_opt(arena_a, a.schema, arena_b, b.schema, Some(id), out)?;
    let dialect = merge_dialect_opt(arena_a, a.dialect, arena_b, b.dialect, Some(id), out);
    let transformations =
        merge_transformations(arena_a, &a.transformations, arena_b, &b.transformations, Some(id), out);
    let mut notes = a.notes.clone();
    notes.extend(b.notes.clone());

    let merged = TableData {
        url: a.url.clone(),
        schema,
        dialect,
        transformations,
        notes,
        suppress_output: a.suppress_output,
        table_direction: a.table_direction,
        inheritable: merge_inheritable(&a.inheritable, &b.inheritable),
    };
    if let NodeKind::Table(slot) = &mut out.node_mut(id).kind {
        *slot = merged;
    }
    Ok(id)
}

fn copy_table(arena: &Arena, id: NodeId, parent: Option<NodeId>, out: &mut Arena) -> NodeId {
    let NodeKind::Table(data) = &arena.node(id).kind else { unreachable!("expected Table") };
    let new_id = out.push(parent, NodeKind::Table(TableData::default()));
    let schema = data.schema.map(|sid| copy_schema(arena, sid, Some(new_id), out));
    let dialect = data.dialect.map(|did| copy_dialect(arena, did, Some(new_id), out));
    let transformations =
        data.transformations.iter().map(|&tid| copy_transformation(arena, tid, Some(new_id), out)).collect();
    let mut copied = data.clone();
    copied.schema = schema;
    copied.dialect = dialect;
    copied.transformations = transformations;
    if let NodeKind::Table(slot) = &mut out.node_mut(new_id).kind {
        *slot = copied;
    }
    new_id
}

fn merge_table_group(
    arena_a: &Arena,
    a: &TableGroupData,
    arena_b: &Arena,
    b: &TableGroupData,
    out: &mut Arena,
) -> Result<NodeId, MergeError> {
    let id = out.push(None, NodeKind::TableGroup(TableGroupData::default()));

    let mut tables = Vec::new();
    let mut matched_b = vec![false; b.tables.len()];
    for &a_table_id in &a.tables {
        let NodeKind::Table(a_table) = &arena_a.node(a_table_id).kind else { continue };
        let partner = b.tables.iter().position(|&bid| {
            matches!(&arena_b.node(bid).kind, NodeKind::Table(bt) if bt.url == a_table.url)
        });
        match partner {
            Some(b_index) => {
                matched_b[b_index] = true;
                let NodeKind::Table(b_table) = &arena_b.node(b.tables[b_index]).kind else { continue };
                tables.push(merge_table(arena_a, a_table, arena_b, b_table, Some(id), out)?);
            }
            None => tables.push(copy_table(arena_a, a_table_id, Some(id), out)),
        }
    }
    for (index, &b_table_id) in b.tables.iter().enumerate() {
        if !matched_b[index] {
            tables.push(copy_table(arena_b, b_table_id, Some(id), out));
        }
    }

    let schema = merge_schema_opt(arena_a, a.schema, arena_b, b.schema, Some(id), out)?;
    let dialect = merge_dialect_opt(arena_a, a.dialect, arena_b, b.dialect, Some(id), out);
    let transformations =
        merge_transformations(arena_a, &a.transformations, arena_b, &b.transformations, Some(id), out);
    let mut notes = a.notes.clone();
    notes.extend(b.notes.clone());

    let merged = TableGroupData {
        tables,
        schema,
        dialect,
        transformations,
        notes,
        table_direction: a.table_direction,
        inheritable: merge_inheritable(&a.inheritable, &b.inheritable),
    };
    if let NodeKind::TableGroup(slot) = &mut out.node_mut(id).kind {
        *slot = merged;
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;
    use crate::metadata::parse::ParseOptions;
    use serde_json::json;

    fn parse(document: serde_json::Value) -> Metadata {
        let mut diagnostics = Diagnostics::new();
        Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap()
    }

    #[test]
    fn merge_identity_leaves_table_list_unchanged() {
        let a = parse(json!({"tables": [{"url": "t.csv", "tableSchema": {"columns": [{"name": "x"}]}}]}));
        let empty = parse(json!({"tables": []}));
        let merged = a.merge(&empty).unwrap();
        let NodeKind::TableGroup(group) = &merged.arena.node(merged.root).kind else { unreachable!() };
        assert_eq!(group.tables.len(), 1);
    }

    #[test]
    fn merge_unions_tables_by_url() {
        let a = parse(json!({"tables": [{"url": "a.csv"}]}));
        let b = parse(json!({"tables": [{"url": "b.csv"}]}));
        let merged = a.merge(&b).unwrap();
        let NodeKind::TableGroup(group) = &merged.arena.node(merged.root).kind else { unreachable!() };
        assert_eq!(group.tables.len(), 2);
    }

    #[test]
    fn merge_matches_columns_by_name_and_fills_datatype_from_embedded() {
        let user = parse(json!({
            "tables": [{"url": "t.csv", "tableSchema": {"columns": [{"name": "age", "datatype": "integer"}]}}]
        }));
        let embedded = parse(json!({
            "tables": [{"url": "t.csv", "tableSchema": {"columns": [{"name": "age"}]}}]
        }));
        let merged = user.merge(&embedded).unwrap();
        let NodeKind::TableGroup(group) = &merged.arena.node(merged.root).kind else { unreachable!() };
        let NodeKind::Table(table) = &merged.arena.node(group.tables[0]).kind else { unreachable!() };
        let NodeKind::Schema(schema) = &merged.arena.node(table.schema.unwrap()).kind else { unreachable!() };
        let NodeKind::Column(column) = &merged.arena.node(schema.columns[0]).kind else { unreachable!() };
        assert_eq!(column.inheritable.datatype.as_ref().unwrap().base, "integer");
    }

    #[test]
    fn merge_is_associative_over_disjoint_table_urls() {
        let a = parse(json!({"tables": [{"url": "a.csv"}]}));
        let b = parse(json!({"tables": [{"url": "b.csv"}]}));
        let c = parse(json!({"tables": [{"url": "c.csv"}]}));

        let left = a.merge(&b).unwrap().merge(&c).unwrap();
        let right = a.merge(&b.merge(&c).unwrap()).unwrap();

        let table_urls = |metadata: &Metadata| -> Vec<String> {
            let NodeKind::TableGroup(group) = &metadata.arena.node(metadata.root).kind else { unreachable!() };
            group
                .tables
                .iter()
                .map(|&id| {
                    let NodeKind::Table(table) = &metadata.arena.node(id).kind else { unreachable!() };
                    table.url.clone()
                })
                .collect()
        };
        assert_eq!(table_urls(&left), table_urls(&right));
    }

    #[test]
    fn merge_reports_column_count_mismatch() {
        let user = parse(json!({
            "tables": [{"url": "t.csv", "tableSchema": {"columns": [{"name": "a"}, {"name": "b"}]}}]
        }));
        let embedded = parse(json!({
            "tables": [{"url": "t.csv", "tableSchema": {"columns": [{"name": "a"}]}}]
        }));
        let err = user.verify_compatible(&embedded).unwrap_err();
        assert!(matches!(err, MergeError::ColumnCountMismatch { .. }));
    }
}
