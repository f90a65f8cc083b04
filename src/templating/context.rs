//! Rendering context handed to dialect templates.
//!
//! Templates see read-only views with every derived string precomputed, so they
//! never need to build `#{...}` parameter expressions themselves:
//!
//! - `context`: `namespace`, `entity_name`, `mapper_name`
//! - `table`: `name`
//! - `key`: the primary key column view
//! - `columns` / `all_columns`: persistent columns / every extracted column
//! - `insert_columns`, `update_columns`
//! - `logic_delete`, `version`: the special columns, if any
//! - `associations`: `property`, `join_column`, `lookup_expression`
//! - `count_expression`

use serde::Serialize;
use tera::Context as TeraContext;

use crate::core::{MapperError, Result};
use crate::metadata::naming::upper_first;
use crate::metadata::{AssociationMetadata, ColumnMetadata, EntityMetadata, KeyStrategy, StatementKind};
use crate::model::MapperDecl;

const ENTITY_PREFIX: &str = "entity.";

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceView {
    pub namespace: String,
    pub entity_name: String,
    pub mapper_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    pub name: String,
}

/// Template view of one column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnView {
    pub member: String,
    pub member_uf: String,
    pub column: String,
    pub java_type: String,
    pub jdbc_type: String,
    pub is_pk: bool,
    pub is_identity: bool,
    pub is_uuid: bool,
    pub is_sequence: bool,
    pub sequence_name: String,
    pub is_version: bool,
    pub is_enum: bool,
    pub is_transient: bool,
    pub is_logic_delete: bool,
    pub logic_delete_value: String,
    pub logic_not_delete_value: String,
    pub is_insert_column: bool,
    pub is_update_column: bool,
    pub is_custom_fill: bool,
    /// `#{member}` without any type handler.
    pub param: String,
    pub insert_value: String,
    pub insert_value_prefix: String,
    pub update_value: String,
    pub update_value_prefix: String,
    pub select_value: String,
    pub jdbc_type_property: String,
    pub type_handler_property: String,
}

impl From<&ColumnMetadata> for ColumnView {
    fn from(c: &ColumnMetadata) -> Self {
        let (delete, not_delete) = c
            .logic_delete
            .as_ref()
            .map(|ld| (ld.delete_literal(), ld.not_delete_literal()))
            .unwrap_or_default();
        let sequence_name = match &c.key_strategy {
            KeyStrategy::Sequence(name) if c.is_primary_key => name.clone(),
            _ => String::new(),
        };
        Self {
            member: c.member_name.clone(),
            member_uf: upper_first(&c.member_name),
            column: c.column_name.clone(),
            java_type: c.semantic_type.boxed.clone(),
            jdbc_type: c.semantic_type.sql_type.clone(),
            is_pk: c.is_primary_key,
            is_identity: c.is_identity(),
            is_uuid: c.is_primary_key && c.key_strategy == KeyStrategy::Uuid,
            is_sequence: !sequence_name.is_empty(),
            sequence_name,
            is_version: c.is_version,
            is_enum: c.is_enum,
            is_transient: c.is_transient,
            is_logic_delete: c.logic_delete.is_some(),
            logic_delete_value: delete,
            logic_not_delete_value: not_delete,
            is_insert_column: c.is_insert_column(),
            is_update_column: c.is_update_column(),
            is_custom_fill: c.fill.as_ref().is_some_and(|f| f.custom),
            param: format!("#{{{}}}", c.member_name),
            insert_value: c.value_expression(StatementKind::Insert, ""),
            insert_value_prefix: c.value_expression(StatementKind::Insert, ENTITY_PREFIX),
            update_value: c.value_expression(StatementKind::Update, ""),
            update_value_prefix: c.value_expression(StatementKind::Update, ENTITY_PREFIX),
            select_value: c.value_expression(StatementKind::Select, ""),
            jdbc_type_property: c.jdbc_type_property(),
            type_handler_property: c.type_handler_property(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssociationView {
    pub property: String,
    pub join_column: String,
    pub lookup_expression: String,
}

impl From<&AssociationMetadata> for AssociationView {
    fn from(a: &AssociationMetadata) -> Self {
        Self {
            property: a.property.clone(),
            join_column: a.join_column.clone(),
            lookup_expression: a.lookup_expression.clone(),
        }
    }
}

/// Everything a dialect template can reference.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    pub context: NamespaceView,
    pub table: TableView,
    pub key: ColumnView,
    pub columns: Vec<ColumnView>,
    pub all_columns: Vec<ColumnView>,
    pub insert_columns: Vec<ColumnView>,
    pub update_columns: Vec<ColumnView>,
    pub logic_delete: Option<ColumnView>,
    pub version: Option<ColumnView>,
    pub associations: Vec<AssociationView>,
    pub count_expression: String,
}

impl RenderContext {
    /// Assemble the context for one mapper.
    pub fn new(mapper: &MapperDecl, metadata: &EntityMetadata, count_expression: &str) -> Result<Self> {
        let key = metadata
            .primary_key
            .as_ref()
            .ok_or_else(|| MapperError::InvalidMetadata {
                entity: metadata.entity_name.clone(),
                reason: "no primary key column".to_string(),
            })?;

        let persistent: Vec<&ColumnMetadata> = metadata.persistent_columns().collect();
        Ok(Self {
            context: NamespaceView {
                namespace: mapper.namespace.clone(),
                entity_name: metadata.entity_name.clone(),
                mapper_name: mapper.simple_name().to_string(),
            },
            table: TableView {
                name: metadata.table_name.clone(),
            },
            key: ColumnView::from(key),
            columns: persistent.iter().copied().map(ColumnView::from).collect(),
            all_columns: metadata.columns.iter().map(ColumnView::from).collect(),
            insert_columns: persistent
                .iter()
                .copied()
                .filter(|c| c.is_insert_column())
                .map(ColumnView::from)
                .collect(),
            update_columns: persistent
                .iter()
                .copied()
                .filter(|c| c.is_update_column())
                .map(ColumnView::from)
                .collect(),
            logic_delete: metadata.logic_delete_column().map(ColumnView::from),
            version: metadata.version_column().map(ColumnView::from),
            associations: metadata.associations.iter().map(AssociationView::from).collect(),
            count_expression: count_expression.to_string(),
        })
    }

    /// Convert into a Tera context.
    pub fn to_tera(&self) -> Result<TeraContext> {
        TeraContext::from_serialize(self).map_err(|e| MapperError::TemplateRender {
            namespace: self.context.namespace.clone(),
            message: format!("context serialization failed: {e}"),
        })
    }
}
