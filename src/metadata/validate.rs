//! Validation pass (`spec.md` §4.1 "Validation"): walks a parsed
//! [`Metadata`] and returns every rule violation found, empty meaning
//! valid. Property-category constraints (rule 3) and `@id` well-
//! formedness (rule 6) are already enforced during construction — an
//! invalid value there reverts the slot to a default or drops it (see
//! `metadata::parse`), so this pass only re-checks conditions that span
//! more than one node: required properties, uniqueness, and foreign-key
//! reachability.

use std::collections::HashSet;

use crate::datatype;
use crate::metadata::node::{ForeignKeyReference, NodeId, NodeKind};
use crate::metadata::parse::Metadata;

impl Metadata {
    /// `Metadata::validate() -> [Error]` (`spec.md` §6).
    pub fn validate(&self) -> Vec<String> {
        validate(self)
    }
}

pub fn validate(metadata: &Metadata) -> Vec<String> {
    let mut errors = Vec::new();
    let arena = &metadata.arena;

    match &arena.node(metadata.root).kind {
        NodeKind::TableGroup(group) => {
            if group.tables.is_empty() {
                errors.push("missing required property 'tables'".to_string());
            }
            let mut seen_urls = HashSet::new();
            for &table_id in &group.tables {
                if let NodeKind::Table(table) = &arena.node(table_id).kind
                    && !seen_urls.insert(table.url.clone())
                {
                    errors.push(format!("duplicate table URL '{}' in table group", table.url));
                }
            }
            if let Some(schema_id) = group.schema {
                validate_schema(metadata, schema_id, &mut errors);
            }
            for &table_id in &group.tables {
                validate_table(metadata, table_id, &mut errors);
            }
        }
        NodeKind::Table(_) => validate_table(metadata, metadata.root, &mut errors),
        _ => errors.push("root metadata node must be a TableGroup or Table".to_string()),
    }

    errors
}

fn validate_table(metadata: &Metadata, table_id: NodeId, errors: &mut Vec<String>) {
    let arena = &metadata.arena;
    let NodeKind::Table(table) = &arena.node(table_id).kind else { return };

    if table.url.is_empty() {
        errors.push("missing required property 'url'".to_string());
    }
    if let Some(schema_id) = table.schema {
        validate_schema(metadata, schema_id, errors);
    }
    for &transformation_id in &table.transformations {
        validate_transformation(metadata, transformation_id, errors);
    }
}

fn validate_transformation(metadata: &Metadata, transformation_id: NodeId, errors: &mut Vec<String>) {
    let NodeKind::Transformation(transformation) = &metadata.arena.node(transformation_id).kind else {
        return;
    };
    if transformation.url.is_empty() {
        errors.push("missing required property 'url' on transformation".to_string());
    }
    if transformation.target_format.is_empty() {
        errors.push("missing required property 'targetFormat' on transformation".to_string());
    }
    if transformation.script_format.is_empty() {
        errors.push("missing required property 'scriptFormat' on transformation".to_string());
    }
}

fn validate_schema(metadata: &Metadata, schema_id: NodeId, errors: &mut Vec<String>) {
    let arena = &metadata.arena;
    let NodeKind::Schema(schema) = &arena.node(schema_id).kind else { return };

    let mut seen_names = HashSet::new();
    let mut column_names = HashSet::new();
    for &column_id in &schema.columns {
        if let NodeKind::Column(column) = &arena.node(column_id).kind
            && let Some(name) = &column.name
        {
            column_names.insert(name.clone());
            if !seen_names.insert(name.clone()) {
                errors.push(format!("duplicate column name '{name}'"));
            }
        }
    }

    for name in &schema.primary_key {
        if !column_names.contains(name) {
            errors.push(format!("'primaryKey' references unknown column '{name}'"));
        }
    }

    for foreign_key in &schema.foreign_keys {
        for name in &foreign_key.column_reference {
            if !column_names.contains(name) {
                errors.push(format!("invalid property 'foreignKeys': unknown column '{name}'"));
            }
        }
        match &foreign_key.reference {
            ForeignKeyReference::Resource { resource, .. } => {
                if !table_group_has_table_url(metadata, resource) {
                    errors.push(format!(
                        "invalid property 'foreignKeys': table referenced by {resource} not found"
                    ));
                }
            }
            ForeignKeyReference::SchemaReference { schema_reference, .. } => {
                if !table_group_has_schema_id(metadata, schema_reference) {
                    errors.push(format!(
                        "invalid property 'foreignKeys': schema referenced by {schema_reference} not found"
                    ));
                }
            }
            ForeignKeyReference::Unresolved => {
                errors.push("invalid property 'foreignKeys': missing 'reference'".to_string());
            }
        }
    }

    for &column_id in &schema.columns {
        if let Some(datatype) = arena.node(column_id).kind.inheritable().and_then(|i| i.datatype.as_ref()) {
            validate_datatype(datatype, errors);
        }
    }
}

fn validate_datatype(decl: &crate::metadata::node::DatatypeDecl, errors: &mut Vec<String>) {
    let is_absolute_iri = decl.base.contains("://");
    if !datatype::is_builtin(&decl.base) && !is_absolute_iri {
        errors.push(format!("invalid datatype base '{}': not a known built-in or absolute IRI", decl.base));
    }
    if let (Some(length), Some(min_length)) = (decl.length, decl.min_length)
        && length != min_length
    {
        errors.push("'length' must equal 'minLength' when both are present".to_string());
    }
    if let (Some(length), Some(max_length)) = (decl.length, decl.max_length)
        && length != max_length
    {
        errors.push("'length' must equal 'maxLength' when both are present".to_string());
    }
}

fn table_group_has_table_url(metadata: &Metadata, url: &str) -> bool {
    let arena = &metadata.arena;
    let NodeKind::TableGroup(group) = &arena.node(metadata.root).kind else { return true };
    group
        .tables
        .iter()
        .filter(|&&id| matches!(&arena.node(id).kind, NodeKind::Table(t) if t.url == url))
        .count()
        == 1
}

fn table_group_has_schema_id(metadata: &Metadata, schema_id_value: &str) -> bool {
    let arena = &metadata.arena;
    let NodeKind::TableGroup(group) = &arena.node(metadata.root).kind else { return true };
    let mut count = 0;
    for &table_id in &group.tables {
        if let NodeKind::Table(table) = &arena.node(table_id).kind
            && let Some(schema_id) = table.schema
            && let NodeKind::Schema(schema) = &arena.node(schema_id).kind
            && schema.id.as_deref() == Some(schema_id_value)
        {
            count += 1;
        }
    }
    count == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;
    use crate::metadata::parse::ParseOptions;
    use serde_json::json;

    #[test]
    fn minimal_group_validates_cleanly() {
        let document = json!({"tables": [{"url": "t.csv"}]});
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        assert!(metadata.validate().is_empty());
    }

    #[test]
    fn duplicate_column_names_are_reported() {
        let document = json!({
            "tables": [{"url": "t.csv", "tableSchema": {"columns": [{"name": "a"}, {"name": "a"}]}}]
        });
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let errors = metadata.validate();
        assert!(errors.iter().any(|e| e.contains("duplicate column name")));
    }

    #[test]
    fn foreign_key_to_missing_table_is_reported_per_scenario_s6() {
        let document = json!({
            "tables": [{
                "url": "t.csv",
                "tableSchema": {
                    "columns": [{"name": "id"}],
                    "foreignKeys": [{
                        "columnReference": "id",
                        "reference": {"resource": "other.csv", "columnReference": "id"}
                    }]
                }
            }]
        });
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let errors = metadata.validate();
        assert!(errors.iter().any(|e| e.contains("other.csv") && e.contains("not found")));
    }

    #[test]
    fn unknown_datatype_base_is_reported() {
        let document = json!({
            "tables": [{"url": "t.csv", "tableSchema": {"columns": [{"name": "a", "datatype": "not-a-type"}]}}]
        });
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let errors = metadata.validate();
        assert!(errors.iter().any(|e| e.contains("not a known built-in")));
    }
}
