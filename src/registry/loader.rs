//! Loading mapping documents into registry entries.
//!
//! Walks the direct children of a document's `<mapper>` root and turns each
//! recognised element into an entry keyed by `namespace.id`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::constants::{ATTR_NAMESPACE, LOADED_NAMESPACE_PREFIX, NODE_MAPPER, SELECT_KEY_SUFFIX};
use crate::core::{MapperError, Result};
use crate::document::FinalDocument;
use crate::fragment::xml::{self, Element};

use super::RegistryState;

/// SQL command of a mapped statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlCommand {
    Select,
    Insert,
    Update,
    Delete,
}

impl SqlCommand {
    fn from_element(name: &str) -> Option<Self> {
        match name {
            "select" => Some(Self::Select),
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// A `<select>`, `<insert>`, `<update>` or `<delete>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedStatement {
    /// `namespace.id`
    pub id: String,
    pub namespace: String,
    pub command: SqlCommand,
    pub result_map: Option<String>,
    pub result_type: Option<String>,
    pub parameter_type: Option<String>,
    pub use_generated_keys: bool,
    pub key_property: Option<String>,
    /// Raw element body, dynamic tags included.
    pub sql: String,
    /// Document the statement was loaded from.
    pub resource: String,
}

/// A `<resultMap>` or `<parameterMap>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMap {
    pub id: String,
    pub type_name: Option<String>,
    /// Child mapping elements in document order (`id`, `result`, `association`...).
    pub mappings: Vec<String>,
    pub resource: String,
}

/// A reusable `<sql>` fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlFragment {
    pub id: String,
    pub body: String,
}

/// Second-level cache declared by `<cache>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheDecl {
    pub namespace: String,
    pub attributes: BTreeMap<String, String>,
}

/// Key generator derived from a `<selectKey>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyGenerator {
    /// `namespace.statementId!selectKey`
    pub id: String,
    pub key_property: Option<String>,
    /// `BEFORE` or `AFTER`
    pub order: String,
    pub sql: String,
}

/// Load one document into `state`.
///
/// A resource loaded before is skipped. Entries whose key already exists are
/// rejected with [`MapperError::DuplicateEntry`]; the caller discards the
/// partially loaded state in that case.
pub fn load_document(state: &mut RegistryState, doc: &FinalDocument) -> Result<()> {
    if state.loaded_resources.contains_key(&doc.resource) {
        tracing::debug!("Resource {} already loaded, skipping", doc.resource);
        return Ok(());
    }

    let invalid = |reason: String| MapperError::InvalidFragment {
        filename: doc.resource.clone(),
        reason,
    };
    let root = xml::root(&doc.content).map_err(invalid)?;
    if root.name != NODE_MAPPER {
        return Err(invalid(format!("root element is <{}>, expected <{NODE_MAPPER}>", root.name)));
    }
    let namespace = root
        .attr(ATTR_NAMESPACE)
        .map(|ns| ns.trim().to_string())
        .filter(|ns| !ns.is_empty())
        .ok_or_else(|| MapperError::MissingNamespace {
            filename: doc.resource.clone(),
        })?;

    let mut counts = [0usize; 3];
    for child in root.children().map_err(invalid)? {
        if let Some(command) = SqlCommand::from_element(child.name) {
            load_statement(state, &namespace, command, &child, doc)?;
            counts[0] += 1;
            continue;
        }
        match child.name {
            "resultMap" => {
                let map = type_map(&namespace, &child, doc)?;
                insert_unique(&mut state.result_maps, "result map", map.id.clone(), map)?;
                counts[1] += 1;
            }
            "parameterMap" => {
                let map = type_map(&namespace, &child, doc)?;
                insert_unique(&mut state.parameter_maps, "parameter map", map.id.clone(), map)?;
            }
            "sql" => {
                let id = qualified_id(&namespace, &child, doc)?;
                let fragment = SqlFragment {
                    id: id.clone(),
                    body: child.inner_text().trim().to_string(),
                };
                insert_unique(&mut state.sql_fragments, "sql fragment", id, fragment)?;
                counts[2] += 1;
            }
            "cache" => {
                let cache = CacheDecl {
                    namespace: namespace.clone(),
                    attributes: child.attributes().into_iter().collect(),
                };
                insert_unique(&mut state.caches, "cache", namespace.clone(), cache)?;
            }
            other => tracing::trace!("Ignoring <{other}> in {}", doc.resource),
        }
    }

    state
        .loaded_resources
        .insert(format!("{LOADED_NAMESPACE_PREFIX}{namespace}"), namespace.clone());
    state.loaded_resources.insert(doc.resource.clone(), namespace.clone());
    tracing::debug!(
        "Loaded {} ({namespace}): {} statements, {} result maps, {} sql fragments",
        doc.resource,
        counts[0],
        counts[1],
        counts[2]
    );
    Ok(())
}

fn load_statement(
    state: &mut RegistryState,
    namespace: &str,
    command: SqlCommand,
    element: &Element<'_>,
    doc: &FinalDocument,
) -> Result<()> {
    let id = qualified_id(namespace, element, doc)?;

    for child in element.children().map_err(|reason| MapperError::InvalidFragment {
        filename: doc.resource.clone(),
        reason,
    })? {
        if child.name == "selectKey" {
            let key_id = format!("{id}{SELECT_KEY_SUFFIX}");
            let generator = KeyGenerator {
                id: key_id.clone(),
                key_property: child.attr("keyProperty"),
                order: child.attr("order").unwrap_or_else(|| "AFTER".to_string()),
                sql: child.inner_text().trim().to_string(),
            };
            insert_unique(&mut state.key_generators, "key generator", key_id, generator)?;
        }
    }

    let statement = MappedStatement {
        id: id.clone(),
        namespace: namespace.to_string(),
        command,
        result_map: element.attr("resultMap").map(|r| qualify(namespace, &r)),
        result_type: element.attr("resultType"),
        parameter_type: element.attr("parameterType"),
        use_generated_keys: element.attr("useGeneratedKeys").as_deref() == Some("true"),
        key_property: element.attr("keyProperty"),
        sql: element.inner_text().trim().to_string(),
        resource: doc.resource.clone(),
    };
    insert_unique(&mut state.statements, "statement", id, statement)
}

fn type_map(namespace: &str, element: &Element<'_>, doc: &FinalDocument) -> Result<TypeMap> {
    let mappings = element
        .children()
        .map_err(|reason| MapperError::InvalidFragment {
            filename: doc.resource.clone(),
            reason,
        })?
        .iter()
        .map(|c| c.name.to_string())
        .collect();
    Ok(TypeMap {
        id: qualified_id(namespace, element, doc)?,
        type_name: element.attr("type"),
        mappings,
        resource: doc.resource.clone(),
    })
}

fn qualified_id(namespace: &str, element: &Element<'_>, doc: &FinalDocument) -> Result<String> {
    let id = element
        .attr("id")
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| MapperError::InvalidFragment {
            filename: doc.resource.clone(),
            reason: format!("<{}> without an id in namespace {namespace}", element.name),
        })?;
    Ok(qualify(namespace, id.trim()))
}

/// Prefix a local reference with the namespace unless it already names one.
fn qualify(namespace: &str, id: &str) -> String {
    if id.contains('.') {
        id.to_string()
    } else {
        format!("{namespace}.{id}")
    }
}

fn insert_unique<T>(map: &mut BTreeMap<String, Arc<T>>, kind: &'static str, key: String, value: T) -> Result<()> {
    if map.contains_key(&key) {
        return Err(MapperError::DuplicateEntry { kind, key });
    }
    map.insert(key, Arc::new(value));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentOrigin;

    fn doc(resource: &str, content: &str) -> FinalDocument {
        FinalDocument {
            resource: resource.to_string(),
            namespace: String::new(),
            content: content.to_string(),
            origin: DocumentOrigin::Leftover,
            source: None,
        }
    }

    #[test]
    fn test_loads_every_entry_kind() {
        let mut state = RegistryState::default();
        let content = r#"<mapper namespace="demo.OrderMapper">
            <cache eviction="LRU"/>
            <resultMap id="baseResultMap" type="Order"><id column="id" property="id"/><result column="amount" property="amount"/></resultMap>
            <parameterMap id="params" type="Order"/>
            <sql id="cols">id, amount</sql>
            <select id="getById" resultMap="baseResultMap">SELECT <include refid="cols"/> FROM t_order</select>
            <insert id="insert" useGeneratedKeys="true" keyProperty="id">INSERT INTO t_order</insert>
            <insert id="insertSeq"><selectKey keyProperty="id" order="BEFORE">SELECT seq.NEXTVAL FROM DUAL</selectKey>INSERT</insert>
            <update id="update">UPDATE t_order</update>
            <delete id="delete">DELETE FROM t_order</delete>
        </mapper>"#;
        load_document(&mut state, &doc("demo.OrderMapper.xml", content)).unwrap();

        let get = state.statement("demo.OrderMapper.getById").unwrap();
        assert_eq!(get.command, SqlCommand::Select);
        assert_eq!(get.result_map.as_deref(), Some("demo.OrderMapper.baseResultMap"));
        assert!(state.statement("demo.OrderMapper.insert").unwrap().use_generated_keys);
        assert_eq!(state.statements.len(), 5);

        let map = &state.result_maps["demo.OrderMapper.baseResultMap"];
        assert_eq!(map.mappings, ["id", "result"]);
        assert!(state.parameter_maps.contains_key("demo.OrderMapper.params"));
        assert_eq!(state.sql_fragments["demo.OrderMapper.cols"].body, "id, amount");
        assert_eq!(state.caches["demo.OrderMapper"].attributes["eviction"], "LRU");

        let key = &state.key_generators["demo.OrderMapper.insertSeq!selectKey"];
        assert_eq!(key.order, "BEFORE");
        assert!(state.loaded_resources.contains_key("namespace:demo.OrderMapper"));
        assert!(state.loaded_resources.contains_key("demo.OrderMapper.xml"));
    }

    #[test]
    fn test_duplicate_statement_rejected() {
        let mut state = RegistryState::default();
        load_document(
            &mut state,
            &doc("A.xml", r#"<mapper namespace="x"><select id="a">1</select></mapper>"#),
        )
        .unwrap();
        let err = load_document(
            &mut state,
            &doc("B.xml", r#"<mapper namespace="x"><select id="a">2</select></mapper>"#),
        )
        .unwrap_err();
        assert!(matches!(err, MapperError::DuplicateEntry { kind: "statement", .. }));
    }

    #[test]
    fn test_loaded_resource_is_skipped() {
        let mut state = RegistryState::default();
        let d = doc("A.xml", r#"<mapper namespace="x"><select id="a">1</select></mapper>"#);
        load_document(&mut state, &d).unwrap();
        load_document(&mut state, &d).unwrap();
        assert_eq!(state.statements.len(), 1);
    }

    #[test]
    fn test_statement_without_id() {
        let mut state = RegistryState::default();
        let err = load_document(
            &mut state,
            &doc("A.xml", r#"<mapper namespace="x"><select>1</select></mapper>"#),
        )
        .unwrap_err();
        assert!(matches!(err, MapperError::InvalidFragment { .. }));
    }
}
