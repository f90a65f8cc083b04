//! Recognised scalar member types and their SQL types.

use serde::Serialize;

/// Resolved type of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemanticType {
    /// Type as declared on the member.
    pub declared: String,
    /// Primitive form (`long`), or the declared name when there is none.
    pub primitive: String,
    /// Boxed form (`Long`).
    pub boxed: String,
    /// Generic SQL type (`BIGINT`).
    pub sql_type: String,
}

// (primitive, boxed, sql type)
const SCALARS: &[(&str, &str, &str)] = &[
    ("boolean", "Boolean", "BIT"),
    ("byte", "Byte", "TINYINT"),
    ("short", "Short", "SMALLINT"),
    ("char", "Character", "VARCHAR"),
    ("int", "Integer", "INTEGER"),
    ("long", "Long", "BIGINT"),
    ("float", "Float", "FLOAT"),
    ("double", "Double", "DOUBLE"),
    ("byte[]", "Byte[]", "BINARY"),
    ("String", "String", "VARCHAR"),
    ("Date", "Date", "TIMESTAMP"),
    ("Time", "Time", "TIMESTAMP"),
    ("Timestamp", "Timestamp", "TIMESTAMP"),
    ("Instant", "Instant", "TIMESTAMP"),
    ("LocalDateTime", "LocalDateTime", "TIMESTAMP"),
    ("OffsetDateTime", "OffsetDateTime", "TIMESTAMP"),
    ("ZonedDateTime", "ZonedDateTime", "TIMESTAMP"),
    ("LocalDate", "LocalDate", "DATE"),
    ("BigDecimal", "BigDecimal", "DECIMAL"),
    ("Clob", "Clob", "CLOB"),
    ("Blob", "Blob", "BLOB"),
];

/// Resolve a declared scalar type, accepting qualified names (`java.lang.Long`).
pub fn resolve_scalar(declared: &str) -> Option<SemanticType> {
    let simple = declared.rsplit('.').next().unwrap_or(declared).trim();
    SCALARS
        .iter()
        .find(|(primitive, boxed, _)| *primitive == simple || *boxed == simple)
        .map(|(primitive, boxed, sql_type)| SemanticType {
            declared: declared.to_string(),
            primitive: (*primitive).to_string(),
            boxed: (*boxed).to_string(),
            sql_type: (*sql_type).to_string(),
        })
}

/// Semantic type of an enum column, stored through its scalar code.
pub fn enum_type(enum_name: &str, code: &SemanticType) -> SemanticType {
    SemanticType {
        declared: enum_name.to_string(),
        primitive: enum_name.to_string(),
        boxed: enum_name.to_string(),
        sql_type: code.sql_type.clone(),
    }
}
