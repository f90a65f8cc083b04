//! Declarations of mapped interfaces and entity types.
//!
//! The synthesis pipeline never inspects live types. Instead, every mapped
//! interface, entity and enumeration is described up front, either in a TOML
//! model file or through the builder methods on [`ModelRegistry`]:
//!
//! ```toml
//! [[mappers]]
//! namespace = "demo.OrderMapper"
//! entity = "Order"
//!
//! [[entities]]
//! name = "Order"
//! table = { name = "t_order", key = { name = "id", strategy = "auto" } }
//!
//! [[entities.fields]]
//! name = "id"
//! type = "Long"
//!
//! [[entities.fields]]
//! name = "gmtCreate"
//! type = "LocalDateTime"
//! ```
//!
//! A mapper without an `entity` stands for an interface whose entity type could
//! not be resolved; the extractor reports it as
//! [`MapperError::NotAnEntityInterface`](crate::core::MapperError::NotAnEntityInterface).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::{MapperError, Result};

/// A mapped interface: the namespace under which statements are registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapperDecl {
    /// Fully-qualified identifier, e.g. `demo.OrderMapper`.
    pub namespace: String,
    /// Entity type the mapper serves; `None` when it has no concrete entity.
    #[serde(default)]
    pub entity: Option<String>,
}

impl MapperDecl {
    /// Create a mapper serving `entity`.
    pub fn new(namespace: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entity: Some(entity.into()),
        }
    }

    /// Create a mapper with no concrete entity type.
    pub fn untyped(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entity: None,
        }
    }

    /// Last segment of the namespace (`OrderMapper` for `demo.OrderMapper`).
    pub fn simple_name(&self) -> &str {
        self.namespace.rsplit('.').next().unwrap_or(&self.namespace)
    }

    /// Whether the namespace lives under one of the given packages.
    ///
    /// An empty package list matches everything.
    pub fn is_under(&self, packages: &[String]) -> bool {
        packages.is_empty()
            || packages.iter().any(|pkg| {
                let pkg = pkg.trim_end_matches('.');
                self.namespace == pkg
                    || self
                        .namespace
                        .strip_prefix(pkg)
                        .is_some_and(|rest| rest.starts_with('.'))
            })
    }
}

/// Key generation declared on an entity's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategyDecl {
    /// Database auto-increment
    #[default]
    Auto,
    /// Generated UUID
    Uuid,
    /// Application supplied
    None,
}

/// Primary key declaration on a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyDecl {
    /// Key column name; defaults to the configured global id name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub strategy: KeyStrategyDecl,
    /// Sequence feeding the key (Oracle style).
    #[serde(default)]
    pub sequence: Option<String>,
}

/// Table declaration on an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDecl {
    /// Explicit table name.
    #[serde(default)]
    pub name: Option<String>,
    /// Explicit primary key declaration.
    #[serde(default)]
    pub key: Option<KeyDecl>,
}

/// Logic-delete marker on a field. Blank values fall back to the global ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogicDeleteDecl {
    #[serde(default)]
    pub delete_value: Option<String>,
    #[serde(default)]
    pub not_delete_value: Option<String>,
}

/// One declared member of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDecl {
    /// Member name, e.g. `gmtCreate`.
    pub name: String,
    /// Declared type: a scalar (`Long`, `String`, ...), an enum, or an entity.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Explicit column binding.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub transient: bool,
    /// Optimistic lock version column.
    #[serde(default)]
    pub version: bool,
    #[serde(default)]
    pub logic_delete: Option<LogicDeleteDecl>,
    /// Join column of a lazily fetched association.
    #[serde(default)]
    pub lazy_column: Option<String>,
}

impl FieldDecl {
    /// Create a field of the given declared type.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            column: None,
            transient: false,
            version: false,
            logic_delete: None,
            lazy_column: None,
        }
    }

    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    #[must_use]
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    #[must_use]
    pub fn version(mut self) -> Self {
        self.version = true;
        self
    }

    #[must_use]
    pub fn logic_delete(mut self) -> Self {
        self.logic_delete = Some(LogicDeleteDecl::default());
        self
    }

    #[must_use]
    pub fn lazy(mut self, join_column: impl Into<String>) -> Self {
        self.lazy_column = Some(join_column.into());
        self
    }
}

/// An entity type and its ordered members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDecl {
    pub name: String,
    #[serde(default)]
    pub table: Option<TableDecl>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

impl EntityDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    /// Declare the table name.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table.get_or_insert_with(TableDecl::default).name = Some(name.into());
        self
    }

    /// Declare the primary key.
    #[must_use]
    pub fn key(mut self, key: KeyDecl) -> Self {
        self.table.get_or_insert_with(TableDecl::default).key = Some(key);
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }
}

/// An enumeration usable as a column type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDecl {
    pub name: String,
    /// Scalar type of the stored code; enums without one cannot be columns.
    #[serde(default)]
    pub code_type: Option<String>,
}

/// All declarations known to a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelRegistry {
    mappers: Vec<MapperDecl>,
    entities: Vec<EntityDecl>,
    enums: Vec<EnumDecl>,
    #[serde(skip)]
    entity_index: BTreeMap<String, usize>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a model from TOML text.
    pub fn from_toml_str(content: &str, file: &str) -> Result<Self> {
        let mut model: Self = toml::from_str(content).map_err(|source| MapperError::Toml {
            file: file.to_string(),
            source,
        })?;
        model.reindex();
        model.validate()?;
        Ok(model)
    }

    /// Load a model file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| MapperError::io("read model", path, e))?;
        let model = Self::from_toml_str(&content, &path.display().to_string())?;
        tracing::debug!(
            "Loaded {} mappers and {} entities from {}",
            model.mappers.len(),
            model.entities.len(),
            path.display()
        );
        Ok(model)
    }

    #[must_use]
    pub fn with_mapper(mut self, mapper: MapperDecl) -> Self {
        self.mappers.push(mapper);
        self
    }

    #[must_use]
    pub fn with_entity(mut self, entity: EntityDecl) -> Self {
        self.entity_index.insert(entity.name.clone(), self.entities.len());
        self.entities.push(entity);
        self
    }

    #[must_use]
    pub fn with_enum(mut self, decl: EnumDecl) -> Self {
        self.enums.push(decl);
        self
    }

    fn reindex(&mut self) {
        self.entity_index = self
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
    }

    /// Every mapper must name a declared entity and namespaces must be unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for mapper in &self.mappers {
            if !seen.insert(mapper.namespace.as_str()) {
                return Err(MapperError::DuplicateEntry {
                    kind: "mapper",
                    key: mapper.namespace.clone(),
                });
            }
            if let Some(entity) = &mapper.entity
                && !self.entity_index.contains_key(entity)
            {
                return Err(MapperError::UnknownEntity {
                    namespace: mapper.namespace.clone(),
                    entity: entity.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDecl> {
        self.entity_index.get(name).map(|&i| &self.entities[i])
    }

    pub fn enum_decl(&self, name: &str) -> Option<&EnumDecl> {
        self.enums.iter().find(|e| e.name == name)
    }

    pub fn mappers(&self) -> &[MapperDecl] {
        &self.mappers
    }

    /// Mappers under the given packages, sorted by namespace.
    pub fn mappers_under(&self, packages: &[String]) -> Vec<&MapperDecl> {
        let mut found: Vec<_> = self.mappers.iter().filter(|m| m.is_under(packages)).collect();
        found.sort_by(|a, b| a.namespace.cmp(&b.namespace));
        found
    }

    /// The mapper serving an entity, used to resolve association lookups.
    pub fn mapper_for_entity(&self, entity: &str) -> Option<&MapperDecl> {
        self.mappers
            .iter()
            .find(|m| m.entity.as_deref() == Some(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
[[mappers]]
namespace = "demo.OrderMapper"
entity = "Order"

[[mappers]]
namespace = "demo.sub.RawMapper"

[[entities]]
name = "Order"
table = { name = "t_order", key = { name = "id", strategy = "auto" } }

[[entities.fields]]
name = "id"
type = "Long"

[[entities.fields]]
name = "status"
type = "OrderStatus"

[[enums]]
name = "OrderStatus"
code_type = "Integer"
"#;

    #[test]
    fn test_parse_model() {
        let model = ModelRegistry::from_toml_str(MODEL, "model.toml").unwrap();
        let order = model.entity("Order").unwrap();
        assert_eq!(order.fields.len(), 2);
        let key = order.table.as_ref().and_then(|t| t.key.as_ref()).unwrap();
        assert_eq!(key.strategy, KeyStrategyDecl::Auto);
        assert_eq!(model.enum_decl("OrderStatus").unwrap().code_type.as_deref(), Some("Integer"));
        assert_eq!(model.mapper_for_entity("Order").unwrap().simple_name(), "OrderMapper");
    }

    #[test]
    fn test_unknown_entity_rejected() {
        let err = ModelRegistry::from_toml_str(
            "[[mappers]]\nnamespace = \"a.BMapper\"\nentity = \"Missing\"\n",
            "model.toml",
        )
        .unwrap_err();
        assert!(matches!(err, MapperError::UnknownEntity { .. }));
    }

    #[test]
    fn test_mappers_under_packages() {
        let model = ModelRegistry::from_toml_str(MODEL, "model.toml").unwrap();
        let all = model.mappers_under(&[]);
        assert_eq!(all.len(), 2);

        let sub = model.mappers_under(&["demo.sub".to_string()]);
        assert_eq!(sub.len(), 1);
        assert_eq!(sub[0].namespace, "demo.sub.RawMapper");

        // prefix must end on a segment boundary
        assert!(model.mappers_under(&["dem".to_string()]).is_empty());
    }

    #[test]
    fn test_builder() {
        let model = ModelRegistry::new()
            .with_entity(
                EntityDecl::new("User")
                    .table("t_user")
                    .field(FieldDecl::new("id", "Integer"))
                    .field(FieldDecl::new("name", "String").column("user_name")),
            )
            .with_mapper(MapperDecl::new("app.UserMapper", "User"));

        assert!(model.validate().is_ok());
        assert_eq!(model.entity("User").unwrap().fields[1].column.as_deref(), Some("user_name"));
    }
}
