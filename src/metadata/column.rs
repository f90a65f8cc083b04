//! Column metadata value objects.

use serde::Serialize;

use super::fill::{FillPhase, StatementKind};
use super::types::SemanticType;

/// Key generation strategy of a primary key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "sequence", rename_all = "snake_case")]
pub enum KeyStrategy {
    AutoIncrement,
    Uuid,
    Sequence(String),
    None,
}

/// Stored values of a logic-delete column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogicDelete {
    pub delete_value: String,
    pub not_delete_value: String,
}

impl LogicDelete {
    /// SQL literal of the deleted marker: integers bare, anything else quoted.
    pub fn delete_literal(&self) -> String {
        sql_literal(&self.delete_value)
    }

    /// SQL literal of the live marker.
    pub fn not_delete_literal(&self) -> String {
        sql_literal(&self.not_delete_value)
    }
}

fn sql_literal(value: &str) -> String {
    if value.parse::<i64>().is_ok() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', "''"))
    }
}

/// Type handler bound to a column and the statements it takes part in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FillBinding {
    pub handler: String,
    pub phase: FillPhase,
    /// `true` for user fill handlers, `false` for the enum handler.
    pub custom: bool,
}

/// One mapped member of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMetadata {
    pub member_name: String,
    pub column_name: String,
    pub semantic_type: SemanticType,
    pub is_transient: bool,
    pub is_primary_key: bool,
    pub key_strategy: KeyStrategy,
    pub is_version: bool,
    pub logic_delete: Option<LogicDelete>,
    pub is_ignore_update: bool,
    pub is_enum: bool,
    pub fill: Option<FillBinding>,
    pub order_index: usize,
}

impl ColumnMetadata {
    /// Auto-increment primary key.
    pub fn is_identity(&self) -> bool {
        self.is_primary_key && self.key_strategy == KeyStrategy::AutoIncrement
    }

    /// Written by insert statements.
    pub fn is_insert_column(&self) -> bool {
        !self.is_transient && !self.is_identity() && !self.is_ignore_update
    }

    /// Written by update statements.
    pub fn is_update_column(&self) -> bool {
        !self.is_transient && !self.is_primary_key && !self.is_ignore_update
    }

    fn handler_for(&self, kind: StatementKind) -> Option<&str> {
        self.fill
            .as_ref()
            .filter(|fill| fill.phase.covers(kind))
            .map(|fill| fill.handler.as_str())
    }

    /// Parameter expression such as `#{gmtCreate, typeHandler=gmtCreate}`.
    ///
    /// Version columns update themselves (`version+1`) instead of binding a value.
    pub fn value_expression(&self, kind: StatementKind, prefix: &str) -> String {
        if self.is_version && kind == StatementKind::Update {
            return format!("{}+1", self.column_name);
        }
        match self.handler_for(kind) {
            Some(handler) => format!("#{{{prefix}{}, typeHandler={handler}}}", self.member_name),
            None => format!("#{{{prefix}{}}}", self.member_name),
        }
    }

    /// `jdbcType="..."` attribute, omitted when a type handler decides the type.
    pub fn jdbc_type_property(&self) -> String {
        if self.fill.is_some() {
            String::new()
        } else {
            format!("jdbcType=\"{}\"", self.semantic_type.sql_type)
        }
    }

    /// `typeHandler="..."` attribute for result maps.
    pub fn type_handler_property(&self) -> String {
        self.handler_for(StatementKind::Select)
            .map(|handler| format!("typeHandler=\"{handler}\""))
            .unwrap_or_default()
    }
}
