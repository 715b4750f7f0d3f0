//! The metadata object graph: an arena of [`Node`]s addressed by
//! [`NodeId`], plus the concrete per-kind data each node carries.
//!
//! REDESIGN FLAGS (`spec.md` §9) applied here: cyclic parent references
//! become **arena + index** (`Node::parent: Option<NodeId>` instead of a
//! back-pointer the child owns), and dynamic class dispatch becomes a
//! **sum type over node kinds** (`NodeKind`). Concrete per-kind structs
//! follow the teacher's preference for named, typed fields (`ColumnMeta`,
//! `Schema`, `DecimalSpec` in `schema.rs`) over a reflective property bag.

use std::collections::BTreeMap;

use serde_json::Value as Json;

/// An index into a [`Metadata`] arena. Cheap to copy, stable for the
/// lifetime of the arena it was issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// A language tag to list-of-strings map, the normalized storage form of
/// every `natural_language` property (`spec.md` §4.1).
pub type LanguageMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableDirection {
    Rtl,
    Ltr,
    #[default]
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextDirection {
    Rtl,
    #[default]
    Ltr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    True,
    False,
    Start,
    End,
}

impl Trim {
    /// Applies this dialect's trim policy to a raw field (`spec.md` §4.2
    /// step 2, §4.3, §4.4 step 4c).
    pub fn apply<'a>(self, value: &'a str) -> &'a str {
        match self {
            Trim::True => value.trim(),
            Trim::False => value,
            Trim::Start => value.trim_start(),
            Trim::End => value.trim_end(),
        }
    }
}

/// One cell of the per-column/per-table/per-schema/per-group inheritable
/// property bag (`spec.md` §3 "Inherited properties"). `None` means "not
/// set here"; resolution walks ancestors and finally falls back to the
/// documented default.
#[derive(Debug, Clone, Default)]
pub struct Inheritable {
    pub about_url: Option<String>,
    pub property_url: Option<String>,
    pub value_url: Option<String>,
    pub datatype: Option<DatatypeDecl>,
    pub default: Option<String>,
    pub lang: Option<String>,
    pub null: Option<NullSpec>,
    pub ordered: Option<bool>,
    pub required: Option<bool>,
    pub separator: Option<String>,
    pub text_direction: Option<TextDirection>,
}

/// The `null` inherited property: a single sentinel string, or a list of
/// them (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NullSpec {
    Single(String),
    Multiple(Vec<String>),
}

impl NullSpec {
    pub fn matches(&self, item: &str) -> bool {
        match self {
            NullSpec::Single(s) => s == item,
            NullSpec::Multiple(items) => items.iter().any(|s| s == item),
        }
    }
}

/// A `Datatype` node (`spec.md` §3): `base` is either a built-in name or
/// an absolute IRI; the facets constrain values of that base.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatatypeDecl {
    pub base: String,
    pub format: Option<Json>,
    pub length: Option<u64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub minimum: Option<String>,
    pub maximum: Option<String>,
    pub min_inclusive: Option<String>,
    pub max_inclusive: Option<String>,
    pub min_exclusive: Option<String>,
    pub max_exclusive: Option<String>,
}

impl DatatypeDecl {
    pub fn string() -> Self {
        Self { base: "string".to_string(), ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformationSource {
    Json,
    Rdf,
}

#[derive(Debug, Clone, Default)]
pub struct TransformationData {
    pub url: String,
    pub target_format: String,
    pub script_format: String,
    pub source: Option<TransformationSource>,
    pub titles: LanguageMap,
}

#[derive(Debug, Clone)]
pub struct DialectData {
    pub comment_prefix: Option<char>,
    pub delimiter: char,
    pub double_quote: bool,
    pub encoding: String,
    pub header: bool,
    pub header_row_count: usize,
    pub line_terminators: Vec<String>,
    pub quote_char: Option<char>,
    pub skip_blank_rows: bool,
    pub skip_columns: usize,
    pub skip_initial_space: bool,
    pub skip_rows: usize,
    pub trim: Trim,
}

impl Default for DialectData {
    fn default() -> Self {
        Self {
            comment_prefix: Some('#'),
            delimiter: ',',
            double_quote: true,
            encoding: "utf-8".to_string(),
            header: true,
            header_row_count: 1,
            line_terminators: vec!["\r\n".to_string(), "\n".to_string()],
            quote_char: Some('"'),
            skip_blank_rows: false,
            skip_columns: 0,
            skip_initial_space: false,
            skip_rows: 0,
            trim: Trim::False,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForeignKey {
    pub column_reference: Vec<String>,
    pub reference: ForeignKeyReference,
}

#[derive(Debug, Clone, Default)]
pub enum ForeignKeyReference {
    Resource { resource: String, column_reference: Vec<String> },
    SchemaReference { schema_reference: String, column_reference: Vec<String> },
    #[default]
    Unresolved,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaData {
    pub id: Option<String>,
    pub columns: Vec<NodeId>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub inheritable: Inheritable,
}

#[derive(Debug, Clone, Default)]
pub struct ColumnData {
    pub number: usize,
    pub name: Option<String>,
    pub titles: LanguageMap,
    pub virtual_: bool,
    pub suppress_output: bool,
    pub inheritable: Inheritable,
}

#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub url: String,
    pub schema: Option<NodeId>,
    pub dialect: Option<NodeId>,
    pub transformations: Vec<NodeId>,
    pub notes: Vec<Json>,
    pub suppress_output: bool,
    pub table_direction: TableDirection,
    pub inheritable: Inheritable,
}

#[derive(Debug, Clone, Default)]
pub struct TableGroupData {
    pub tables: Vec<NodeId>,
    pub schema: Option<NodeId>,
    pub dialect: Option<NodeId>,
    pub transformations: Vec<NodeId>,
    pub notes: Vec<Json>,
    pub table_direction: TableDirection,
    pub inheritable: Inheritable,
}

/// The sum type over node classes (REDESIGN FLAGS §9: "inheritance by
/// class becomes a sum type over node kinds").
#[derive(Debug, Clone)]
pub enum NodeKind {
    TableGroup(TableGroupData),
    Table(TableData),
    Schema(SchemaData),
    Column(ColumnData),
    Dialect(DialectData),
    Transformation(TransformationData),
    Datatype(DatatypeDecl),
}

impl NodeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::TableGroup(_) => "TableGroup",
            NodeKind::Table(_) => "Table",
            NodeKind::Schema(_) => "Schema",
            NodeKind::Column(_) => "Column",
            NodeKind::Dialect(_) => "Dialect",
            NodeKind::Transformation(_) => "Transformation",
            NodeKind::Datatype(_) => "Datatype",
        }
    }

    pub fn inheritable(&self) -> Option<&Inheritable> {
        match self {
            NodeKind::TableGroup(d) => Some(&d.inheritable),
            NodeKind::Table(d) => Some(&d.inheritable),
            NodeKind::Schema(d) => Some(&d.inheritable),
            NodeKind::Column(d) => Some(&d.inheritable),
            NodeKind::Dialect(_) | NodeKind::Transformation(_) | NodeKind::Datatype(_) => None,
        }
    }

    pub fn inheritable_mut(&mut self) -> Option<&mut Inheritable> {
        match self {
            NodeKind::TableGroup(d) => Some(&mut d.inheritable),
            NodeKind::Table(d) => Some(&mut d.inheritable),
            NodeKind::Schema(d) => Some(&mut d.inheritable),
            NodeKind::Column(d) => Some(&mut d.inheritable),
            NodeKind::Dialect(_) | NodeKind::Transformation(_) | NodeKind::Datatype(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

/// The arena holding every metadata node reachable from a parsed
/// document's root `TableGroup`.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<Node>,
    pub root: Option<NodeId>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { parent, kind });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    /// The chain from `id` up through every ancestor, `id` first.
    pub fn ancestor_chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(nid) = current {
            chain.push(nid);
            current = self.node(nid).parent;
        }
        chain
    }

    /// Walks `id`'s ancestor chain looking for the first node that has
    /// `field` set on its [`Inheritable`] bag.
    fn resolve<'a, T>(&'a self, id: NodeId, field: impl Fn(&'a Inheritable) -> &'a Option<T>) -> Option<&'a T> {
        for ancestor in self.ancestor_chain(id) {
            if let Some(inheritable) = self.node(ancestor).kind.inheritable()
                && let Some(value) = field(inheritable).as_ref()
            {
                return Some(value);
            }
        }
        None
    }

    pub fn resolve_lang(&self, id: NodeId) -> String {
        self.resolve(id, |i| &i.lang).cloned().unwrap_or_else(|| "und".to_string())
    }

    pub fn resolve_default(&self, id: NodeId) -> String {
        self.resolve(id, |i| &i.default).cloned().unwrap_or_default()
    }

    pub fn resolve_null(&self, id: NodeId) -> NullSpec {
        self.resolve(id, |i| &i.null).cloned().unwrap_or_else(|| NullSpec::Single(String::new()))
    }

    pub fn resolve_ordered(&self, id: NodeId) -> bool {
        self.resolve(id, |i| &i.ordered).copied().unwrap_or(false)
    }

    pub fn resolve_required(&self, id: NodeId) -> bool {
        self.resolve(id, |i| &i.required).copied().unwrap_or(false)
    }

    pub fn resolve_separator(&self, id: NodeId) -> Option<String> {
        self.resolve(id, |i| &i.separator).cloned()
    }

    pub fn resolve_text_direction(&self, id: NodeId) -> TextDirection {
        self.resolve(id, |i| &i.text_direction).copied().unwrap_or(TextDirection::Ltr)
    }

    pub fn resolve_datatype(&self, id: NodeId) -> DatatypeDecl {
        self.resolve(id, |i| &i.datatype).cloned().unwrap_or_else(DatatypeDecl::string)
    }

    pub fn resolve_about_url(&self, id: NodeId) -> Option<String> {
        self.resolve(id, |i| &i.about_url).cloned()
    }

    pub fn resolve_property_url(&self, id: NodeId) -> Option<String> {
        self.resolve(id, |i| &i.property_url).cloned()
    }

    pub fn resolve_value_url(&self, id: NodeId) -> Option<String> {
        self.resolve(id, |i| &i.value_url).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_walks_up_to_parent_when_child_unset() {
        let mut arena = Arena::new();
        let mut parent_inheritable = Inheritable::default();
        parent_inheritable.lang = Some("fr".to_string());
        let parent = arena.push(None, NodeKind::Table(TableData { inheritable: parent_inheritable, ..Default::default() }));
        let child = arena.push(Some(parent), NodeKind::Column(ColumnData::default()));
        assert_eq!(arena.resolve_lang(child), "fr");
    }

    #[test]
    fn resolve_prefers_child_value_over_parent() {
        let mut arena = Arena::new();
        let mut parent_inheritable = Inheritable::default();
        parent_inheritable.lang = Some("fr".to_string());
        let parent = arena.push(None, NodeKind::Table(TableData { inheritable: parent_inheritable, ..Default::default() }));
        let mut child_inheritable = Inheritable::default();
        child_inheritable.lang = Some("de".to_string());
        let child = arena.push(Some(parent), NodeKind::Column(ColumnData { inheritable: child_inheritable, ..Default::default() }));
        assert_eq!(arena.resolve_lang(child), "de");
    }

    #[test]
    fn resolve_falls_back_to_documented_default() {
        let mut arena = Arena::new();
        let only = arena.push(None, NodeKind::Column(ColumnData::default()));
        assert_eq!(arena.resolve_lang(only), "und");
        assert!(!arena.resolve_required(only));
        assert_eq!(arena.resolve_default(only), "");
    }

    #[test]
    fn null_spec_matches_single_and_multiple_forms() {
        assert!(NullSpec::Single("NA".to_string()).matches("NA"));
        assert!(NullSpec::Multiple(vec!["NA".to_string(), "-".to_string()]).matches("-"));
        assert!(!NullSpec::Multiple(vec!["NA".to_string()]).matches("missing"));
    }
}
