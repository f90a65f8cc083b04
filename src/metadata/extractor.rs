//! Builds [`EntityMetadata`] from model declarations.

use crate::config::SeedMapConfig;
use crate::constants::{ASSOCIATION_FORCE_SELECT, ASSOCIATION_SELECT};
use crate::core::{MapperError, Result};
use crate::model::{EntityDecl, FieldDecl, KeyDecl, KeyStrategyDecl, MapperDecl, ModelRegistry};

use super::column::{ColumnMetadata, FillBinding, KeyStrategy, LogicDelete};
use super::entity::{AssociationMetadata, EntityMetadata};
use super::fill::{FillPhase, FillRegistry};
use super::naming::camel_to_underline;
use super::types::{SemanticType, enum_type, resolve_scalar};

/// Extracts entity metadata for mapped interfaces.
///
/// Borrowing everything it needs keeps extraction a pure function of the model,
/// the configuration and the registered fill handlers.
pub struct MetadataExtractor<'a> {
    model: &'a ModelRegistry,
    config: &'a SeedMapConfig,
    fills: &'a FillRegistry,
}

impl<'a> MetadataExtractor<'a> {
    pub fn new(model: &'a ModelRegistry, config: &'a SeedMapConfig, fills: &'a FillRegistry) -> Self {
        Self {
            model,
            config,
            fills,
        }
    }

    /// Extract the metadata of the entity served by `mapper`.
    ///
    /// Fails with [`MapperError::NotAnEntityInterface`] when the mapper has no
    /// concrete entity type; callers turn that into an empty placeholder document.
    pub fn extract(&self, mapper: &MapperDecl) -> Result<EntityMetadata> {
        let entity_name = mapper.entity.as_deref().ok_or_else(|| MapperError::NotAnEntityInterface {
            namespace: mapper.namespace.clone(),
        })?;
        let entity = self.model.entity(entity_name).ok_or_else(|| MapperError::UnknownEntity {
            namespace: mapper.namespace.clone(),
            entity: entity_name.to_string(),
        })?;

        let key_decl = entity.table.as_ref().and_then(|t| t.key.as_ref());
        let key_name = key_decl
            .and_then(|k| k.name.as_deref())
            .unwrap_or(&self.config.global_id_name)
            .to_lowercase();

        let mut columns = Vec::with_capacity(entity.fields.len());
        for (order_index, field) in entity.fields.iter().enumerate() {
            if let Some(column) = self.build_column(entity, field, key_decl, &key_name, order_index)? {
                columns.push(column);
            }
        }

        let primary_key = self.settle_primary_key(entity, &mut columns)?;
        let associations = self.build_associations(entity)?;

        let metadata = EntityMetadata {
            entity_name: entity.name.clone(),
            table_name: self.table_name(entity),
            columns,
            primary_key,
            associations,
        };
        tracing::debug!(
            "Extracted {} columns for {} (table {})",
            metadata.columns.len(),
            metadata.entity_name,
            metadata.table_name
        );
        Ok(metadata)
    }

    fn table_name(&self, entity: &EntityDecl) -> String {
        entity
            .table
            .as_ref()
            .and_then(|t| t.name.clone())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.convert(&entity.name))
    }

    fn convert(&self, name: &str) -> String {
        if self.config.camel_to_underline {
            camel_to_underline(name)
        } else {
            name.to_string()
        }
    }

    fn column_name(&self, field: &FieldDecl) -> String {
        field
            .column
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.convert(&field.name))
    }

    /// Scalar or enum type of a member; `None` for anything else.
    fn resolve_type(&self, entity: &EntityDecl, field: &FieldDecl) -> Result<Option<(SemanticType, bool)>> {
        if let Some(scalar) = resolve_scalar(&field.type_name) {
            return Ok(Some((scalar, false)));
        }
        let Some(decl) = self.model.enum_decl(&field.type_name) else {
            return Ok(None);
        };
        let code = decl
            .code_type
            .as_deref()
            .and_then(resolve_scalar)
            .ok_or_else(|| MapperError::UnsupportedEnumType {
                entity: entity.name.clone(),
                member: field.name.clone(),
                enum_name: decl.name.clone(),
            })?;
        Ok(Some((enum_type(&decl.name, &code), true)))
    }

    fn build_column(
        &self,
        entity: &EntityDecl,
        field: &FieldDecl,
        key_decl: Option<&KeyDecl>,
        key_name: &str,
        order_index: usize,
    ) -> Result<Option<ColumnMetadata>> {
        let Some((semantic_type, is_enum)) = self.resolve_type(entity, field)? else {
            tracing::trace!("Skipping {}.{} of type {}", entity.name, field.name, field.type_name);
            return Ok(None);
        };

        let column_name = self.column_name(field);
        let is_primary_key =
            !field.transient && camel_to_underline(&field.name).to_lowercase() == key_name;
        let key_strategy = if is_primary_key {
            self.key_strategy(entity, key_decl)?
        } else {
            KeyStrategy::None
        };

        let mut fill = is_enum.then(|| FillBinding {
            handler: self.config.enum_type_handler.clone(),
            phase: FillPhase::InsertAndUpdate,
            custom: false,
        });
        if !field.transient
            && let Some(handler) = self.fills.resolve(&entity.name, &field.name, &column_name)
        {
            fill = Some(FillBinding {
                handler: handler.name().to_string(),
                phase: handler.phase(),
                custom: true,
            });
        }

        Ok(Some(ColumnMetadata {
            member_name: field.name.clone(),
            is_ignore_update: self.config.ignore_update_columns.contains(&column_name),
            column_name,
            semantic_type,
            is_transient: field.transient,
            is_primary_key,
            key_strategy,
            is_version: field.version,
            logic_delete: field.logic_delete.as_ref().map(|decl| LogicDelete {
                delete_value: non_blank(decl.delete_value.as_deref())
                    .unwrap_or(&self.config.logic_delete_value)
                    .to_string(),
                not_delete_value: non_blank(decl.not_delete_value.as_deref())
                    .unwrap_or(&self.config.logic_not_delete_value)
                    .to_string(),
            }),
            is_enum,
            fill,
            order_index,
        }))
    }

    /// Precedence: sequence, then AUTO, then UUID, then NONE.
    fn key_strategy(&self, entity: &EntityDecl, key_decl: Option<&KeyDecl>) -> Result<KeyStrategy> {
        let Some(key) = key_decl else {
            return Ok(self.conventional_strategy());
        };
        if let Some(sequence) = non_blank(key.sequence.as_deref()) {
            if key.strategy == KeyStrategyDecl::Uuid {
                return Err(MapperError::ConflictingKeyStrategy {
                    entity: entity.name.clone(),
                    sequence: sequence.to_string(),
                });
            }
            return Ok(KeyStrategy::Sequence(sequence.to_string()));
        }
        Ok(match key.strategy {
            KeyStrategyDecl::Auto => KeyStrategy::AutoIncrement,
            KeyStrategyDecl::Uuid => KeyStrategy::Uuid,
            KeyStrategyDecl::None => KeyStrategy::None,
        })
    }

    fn conventional_strategy(&self) -> KeyStrategy {
        if self.config.global_id_increment {
            KeyStrategy::AutoIncrement
        } else {
            KeyStrategy::None
        }
    }

    /// Enforce a single primary key, promoting one when none was matched.
    fn settle_primary_key(
        &self,
        entity: &EntityDecl,
        columns: &mut [ColumnMetadata],
    ) -> Result<Option<ColumnMetadata>> {
        let keys: Vec<_> = columns.iter().filter(|c| c.is_primary_key).collect();
        if keys.len() > 1 {
            let names: Vec<_> = keys.iter().map(|c| c.column_name.as_str()).collect();
            return Err(MapperError::InvalidMetadata {
                entity: entity.name.clone(),
                reason: format!("more than one primary key column: {}", names.join(", ")),
            });
        }
        if let Some(key) = keys.first() {
            return Ok(Some((*key).clone()));
        }

        let strategy = self.conventional_strategy();
        let promoted = if let Some(pos) = columns
            .iter()
            .position(|c| !c.is_transient && c.column_name == self.config.global_id_name)
        {
            columns[pos].key_strategy = strategy;
            Some(pos)
        } else {
            let first = columns.iter().position(|c| !c.is_transient);
            if let Some(pos) = first {
                tracing::debug!(
                    "No primary key on {}, using first column '{}'",
                    entity.name,
                    columns[pos].column_name
                );
            }
            first
        };

        let Some(pos) = promoted else {
            return Err(MapperError::InvalidMetadata {
                entity: entity.name.clone(),
                reason: "entity has no mappable columns".to_string(),
            });
        };
        columns[pos].is_primary_key = true;
        Ok(Some(columns[pos].clone()))
    }

    fn build_associations(&self, entity: &EntityDecl) -> Result<Vec<AssociationMetadata>> {
        if entity.table.is_none() {
            return Ok(Vec::new());
        }
        let select = if self.config.ignore_logic_delete_with_association {
            ASSOCIATION_FORCE_SELECT
        } else {
            ASSOCIATION_SELECT
        };

        let mut associations = Vec::new();
        for field in entity.fields.iter().filter(|f| !f.transient) {
            let Some(join_column) = non_blank(field.lazy_column.as_deref()) else {
                continue;
            };
            let mapper = self.model.mapper_for_entity(&field.type_name).ok_or_else(|| {
                MapperError::UnknownAssociation {
                    entity: entity.name.clone(),
                    property: field.name.clone(),
                    target: field.type_name.clone(),
                }
            })?;
            associations.push(AssociationMetadata {
                property: field.name.clone(),
                join_column: join_column.to_string(),
                lookup_expression: format!("{}.{select}", mapper.namespace),
            });
        }
        Ok(associations)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
