//! Entity metadata extraction.
//!
//! Walks the declarations in [`crate::model`] and produces immutable
//! [`EntityMetadata`] values: table name, ordered columns, the primary key and
//! lazily fetched associations. Extraction happens once per mapped interface per
//! build.

pub mod column;
pub mod entity;
pub mod extractor;
pub mod fill;
pub mod naming;
pub mod types;

pub use column::{ColumnMetadata, FillBinding, KeyStrategy, LogicDelete};
pub use entity::{AssociationMetadata, EntityMetadata};
pub use extractor::MetadataExtractor;
pub use fill::{ColumnFill, FillHandler, FillPhase, FillRegistry, StatementKind, Supplier};
pub use types::SemanticType;
