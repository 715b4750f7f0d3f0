//! The CSVW metadata object model (`spec.md` §3–§4.1): arena-based node
//! graph, per-property-category validators, construction from JSON,
//! normalization, validation, and merge semantics.

pub mod merge;
pub mod node;
pub mod normalize;
pub mod parse;
pub mod property;
pub mod validate;

pub use node::{
    Arena, ColumnData, DatatypeDecl, DialectData, ForeignKey, ForeignKeyReference, Inheritable,
    LanguageMap, Node, NodeId, NodeKind, NullSpec, SchemaData, TableData, TableDirection,
    TableGroupData, TextDirection, TransformationData, TransformationSource, Trim,
};
pub use parse::{Metadata, ParseOptions};
