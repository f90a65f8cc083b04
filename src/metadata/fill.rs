//! Fill handlers: pluggable value suppliers bound to columns.
//!
//! A fill handler populates a column when a row is inserted or updated, e.g. a
//! `gmt_create` timestamp. During extraction every column asks the
//! [`FillRegistry`] for a handler; the first match in ascending priority wins, and
//! handlers with equal priority keep their registration order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::FillConfig;
use crate::core::{MapperError, Result};

use super::entity::EntityMetadata;

/// Statement phase a fill handler supplies values for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillPhase {
    Insert,
    Update,
    InsertAndUpdate,
}

/// Kind of generated statement a column value is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
}

impl FillPhase {
    /// Whether a handler bound for this phase takes part in `kind` statements.
    ///
    /// Reads always go through the handler so values round-trip.
    pub const fn covers(self, kind: StatementKind) -> bool {
        match (self, kind) {
            (_, StatementKind::Select) | (Self::InsertAndUpdate, _) => true,
            (Self::Insert, StatementKind::Insert) | (Self::Update, StatementKind::Update) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FillPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::InsertAndUpdate => "insert_and_update",
        };
        f.write_str(s)
    }
}

/// A pluggable value supplier.
pub trait FillHandler: Send + Sync + fmt::Debug {
    /// Identifier recorded in the column's fill binding.
    fn name(&self) -> &str;

    fn phase(&self) -> FillPhase;

    /// Lower values are consulted first.
    fn priority(&self) -> i32 {
        i32::MAX
    }

    /// Whether the handler applies to `entity.member` stored in `column`.
    fn matches(&self, entity: &str, member: &str, column: &str) -> bool;

    /// Value to store, if the handler produces one itself.
    fn supply(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Built-in value generators for declarative handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supplier {
    /// Current local time, `YYYY-MM-DD HH:MM:SS`
    Timestamp,
    /// Random UUID without dashes
    Uuid,
}

impl Supplier {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "timestamp" | "now" => Some(Self::Timestamp),
            "uuid" => Some(Self::Uuid),
            _ => None,
        }
    }

    fn generate(self) -> serde_json::Value {
        match self {
            Self::Timestamp => serde_json::Value::String(
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
            Self::Uuid => serde_json::Value::String(uuid::Uuid::new_v4().simple().to_string()),
        }
    }
}

/// Handler bound to one column name, optionally limited to some entities.
#[derive(Debug, Clone)]
pub struct ColumnFill {
    name: String,
    column: String,
    phase: FillPhase,
    entities: Vec<String>,
    priority: i32,
    supplier: Option<Supplier>,
}

impl ColumnFill {
    pub fn new(name: impl Into<String>, column: impl Into<String>, phase: FillPhase) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            phase,
            entities: Vec::new(),
            priority: i32::MAX,
            supplier: None,
        }
    }

    /// `gmt_create` stamped on insert.
    pub fn gmt_create() -> Self {
        Self::new("gmtCreate", "gmt_create", FillPhase::Insert).supplier(Supplier::Timestamp)
    }

    /// `gmt_modified` stamped on insert and update.
    pub fn gmt_modified() -> Self {
        Self::new("gmtModified", "gmt_modified", FillPhase::InsertAndUpdate)
            .supplier(Supplier::Timestamp)
    }

    #[must_use]
    pub const fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn for_entities(mut self, entities: Vec<String>) -> Self {
        self.entities = entities;
        self
    }

    #[must_use]
    pub const fn supplier(mut self, supplier: Supplier) -> Self {
        self.supplier = Some(supplier);
        self
    }
}

impl FillHandler for ColumnFill {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> FillPhase {
        self.phase
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn matches(&self, entity: &str, member: &str, column: &str) -> bool {
        let entity_ok = self.entities.is_empty() || self.entities.iter().any(|e| e == entity);
        entity_ok
            && (self.column.eq_ignore_ascii_case(column) || self.column == member)
    }

    fn supply(&self) -> Option<serde_json::Value> {
        self.supplier.map(Supplier::generate)
    }
}

/// Ordered set of fill handlers.
#[derive(Debug, Clone, Default)]
pub struct FillRegistry {
    handlers: Vec<Arc<dyn FillHandler>>,
}

impl FillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from `[[fills]]` configuration entries.
    pub fn from_config(fills: &[FillConfig]) -> Result<Self> {
        let mut registry = Self::new();
        for entry in fills {
            let mut fill = ColumnFill::new(&entry.handler, &entry.column, entry.phase)
                .priority(entry.priority)
                .for_entities(entry.entities.clone());
            if let Some(name) = &entry.supplier {
                let supplier = Supplier::parse(name).ok_or_else(|| MapperError::ConfigError {
                    message: format!(
                        "fill '{}' uses unknown supplier '{name}' (expected timestamp or uuid)",
                        entry.handler
                    ),
                })?;
                fill = fill.supplier(supplier);
            }
            registry.register(fill);
        }
        Ok(registry)
    }

    pub fn register(&mut self, handler: impl FillHandler + 'static) {
        self.handlers.push(Arc::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// The winning handler for a column, if any.
    pub fn resolve(&self, entity: &str, member: &str, column: &str) -> Option<&Arc<dyn FillHandler>> {
        self.handlers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.matches(entity, member, column))
            .min_by_key(|(index, h)| (h.priority(), *index))
            .map(|(_, h)| h)
    }

    /// Values the handlers supply for a row of `entity` written by a `kind`
    /// statement, keyed by column. Columns whose handler produces no value
    /// itself are left out.
    pub fn supply_row(&self, entity: &EntityMetadata, kind: StatementKind) -> BTreeMap<String, serde_json::Value> {
        entity
            .persistent_columns()
            .filter(|c| c.fill.as_ref().is_some_and(|f| f.custom && f.phase.covers(kind)))
            .filter_map(|c| {
                let value = self
                    .resolve(&entity.entity_name, &c.member_name, &c.column_name)?
                    .supply()?;
                Some((c.column_name.clone(), value))
            })
            .collect()
    }
}
