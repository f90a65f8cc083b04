//! Entity-level metadata.

use serde::Serialize;

use super::column::ColumnMetadata;

/// A lazily fetched association to another mapped entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssociationMetadata {
    pub property: String,
    pub join_column: String,
    /// Single-row fetch statement of the associated mapper, `ns.getById`.
    pub lookup_expression: String,
}

/// Immutable description of one mapped entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityMetadata {
    pub entity_name: String,
    pub table_name: String,
    pub columns: Vec<ColumnMetadata>,
    pub primary_key: Option<ColumnMetadata>,
    pub associations: Vec<AssociationMetadata>,
}

impl EntityMetadata {
    /// Columns that are not transient, in declaration order.
    pub fn persistent_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.iter().filter(|c| !c.is_transient)
    }

    pub fn column(&self, column_name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.column_name == column_name)
    }

    pub fn logic_delete_column(&self) -> Option<&ColumnMetadata> {
        self.persistent_columns().find(|c| c.logic_delete.is_some())
    }

    pub fn version_column(&self) -> Option<&ColumnMetadata> {
        self.persistent_columns().find(|c| c.is_version)
    }
}
