//! Normalization pass (`spec.md` §4.1 "Normalization" / §8 property 1).
//!
//! Most canonicalization (link expansion, natural-language mapping,
//! atomic coercion, datatype-shorthand lifting) already happens while a
//! node is built in `metadata::parse`, so the slots those steps produce
//! are already in storage form by the time `Metadata::normalize` runs.
//! What is left for a standalone pass is re-applying rules that depend
//! on the *whole* graph rather than a single node's JSON — here, `und`
//! natural-language de-duplication, which has to see every language key
//! on a node at once and is safe to re-run any number of times.

use crate::metadata::node::NodeKind;
use crate::metadata::parse::Metadata;
use crate::metadata::property::dedupe_und;

impl Metadata {
    /// `Metadata::normalize() -> Self` (`spec.md` §6). Idempotent: a
    /// second call observes no further change (`spec.md` §8 property 1),
    /// since `dedupe_und` only ever removes already-duplicated entries.
    pub fn normalize(&self) -> Metadata {
        let mut normalized = self.clone();
        for node in normalized.arena.nodes_mut() {
            match &mut node.kind {
                NodeKind::Column(column) => dedupe_und(&mut column.titles),
                NodeKind::Transformation(transformation) => dedupe_und(&mut transformation.titles),
                _ => {}
            }
        }
        normalized
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Diagnostics;
    use crate::metadata::parse::{Metadata, ParseOptions};
    use serde_json::json;

    #[test]
    fn normalize_is_idempotent() {
        let document = json!({
            "tables": [{
                "url": "t.csv",
                "tableSchema": {"columns": [{"name": "a", "titles": {"und": ["Name"], "en": ["Name"]}}]}
            }]
        });
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let once = metadata.normalize();
        let twice = once.normalize();
        assert_eq!(format!("{:?}", once.arena), format!("{:?}", twice.arena));
    }

    #[test]
    fn normalize_drops_und_titles_duplicated_under_another_language() {
        let document = json!({
            "tables": [{
                "url": "t.csv",
                "tableSchema": {"columns": [{"name": "a", "titles": {"und": ["Name", "Unique"], "en": ["Name"]}}]}
            }]
        });
        let mut diagnostics = Diagnostics::new();
        let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
        let normalized = metadata.normalize();
        let NodeKind::TableGroup(group) = &normalized.arena.node(normalized.root).kind else { unreachable!() };
        let NodeKind::Table(table) = &normalized.arena.node(group.tables[0]).kind else { unreachable!() };
        let NodeKind::Schema(schema) = &normalized.arena.node(table.schema.unwrap()).kind else { unreachable!() };
        let NodeKind::Column(column) = &normalized.arena.node(schema.columns[0]).kind else { unreachable!() };
        assert_eq!(column.titles.get("und"), Some(&vec!["Unique".to_string()]));
    }

    use crate::metadata::node::NodeKind;

    proptest::proptest! {
        #[test]
        fn normalize_is_idempotent_for_arbitrary_und_and_en_titles(
            und_titles in proptest::collection::vec("[A-Za-z]{1,8}", 0..4),
            en_titles in proptest::collection::vec("[A-Za-z]{1,8}", 0..4),
        ) {
            let document = json!({
                "tables": [{
                    "url": "t.csv",
                    "tableSchema": {"columns": [{"name": "a", "titles": {"und": und_titles, "en": en_titles}}]}
                }]
            });
            let mut diagnostics = Diagnostics::new();
            let metadata = Metadata::parse(&document, &ParseOptions::default(), &mut diagnostics).unwrap();
            let once = metadata.normalize();
            let twice = once.normalize();
            proptest::prop_assert_eq!(format!("{:?}", once.arena), format!("{:?}", twice.arena));
        }
    }
}
