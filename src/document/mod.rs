//! Document registry builder.
//!
//! Runs extraction, rendering and merging for every mapped interface under the
//! configured base packages and assembles the final ordered document set:
//!
//! 1. one document per mapper, sorted by namespace;
//! 2. every fragment nobody claimed, verbatim, in discovery order;
//! 3. the shared fragment (`common_sql_path`), last, when it exists.
//!
//! Any failure aborts the whole build with [`MapperError::DocumentBuild`]; no
//! partial set is ever returned. The builder also records the primary key of
//! every extracted entity in a [`PrimaryKeyTable`].

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::SeedMapConfig;
use crate::constants::{EMPTY_MAPPER_DOCUMENT, XML_SUFFIX};
use crate::core::{MapperError, Result};
use crate::fragment::{MappingFragment, MergeSession};
use crate::merge::merge;
use crate::metadata::{FillRegistry, MetadataExtractor};
use crate::model::{MapperDecl, ModelRegistry};
use crate::pattern::discover_files;
use crate::templating::{Dialect, RenderContext, TemplateRenderer, resolve_template};

/// Where a final document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentOrigin {
    /// Rendered from the dialect template and merged with fragments
    Generated,
    /// Mapper without an entity type; only merged fragments
    Placeholder,
    /// Fragment no mapper claimed
    Leftover,
    /// The shared fragment
    Shared,
}

impl DocumentOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Placeholder => "placeholder",
            Self::Leftover => "leftover",
            Self::Shared => "shared",
        }
    }
}

/// One document handed to the registry loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalDocument {
    /// Resource name used in logs and "already loaded" markers.
    pub resource: String,
    pub namespace: String,
    pub content: String,
    pub origin: DocumentOrigin,
    /// Backing file for leftovers and the shared fragment.
    pub source: Option<PathBuf>,
}

/// Key column and member of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimaryKeyInfo {
    pub key_column: String,
    pub key_member: String,
}

/// Entity name to primary key, rebuilt with every document set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrimaryKeyTable {
    entries: BTreeMap<String, PrimaryKeyInfo>,
}

impl PrimaryKeyTable {
    /// Record an entity's key. The first record per entity wins.
    pub fn record(&mut self, entity: &str, info: PrimaryKeyInfo) {
        self.entries.entry(entity.to_string()).or_insert(info);
    }

    pub fn lookup(&self, entity: &str) -> Option<&PrimaryKeyInfo> {
        self.entries.get(entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Output of a successful build.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    pub documents: Vec<FinalDocument>,
    pub primary_keys: PrimaryKeyTable,
    /// Hand-authored files the build read; their directories are watched.
    pub fragment_paths: Vec<PathBuf>,
}

impl DocumentSet {
    /// Namespaces of every document in the set, without duplicates.
    pub fn namespaces(&self) -> Vec<String> {
        let mut seen = std::collections::BTreeSet::new();
        self.documents
            .iter()
            .filter(|d| seen.insert(d.namespace.as_str()))
            .map(|d| d.namespace.clone())
            .collect()
    }

    pub fn document(&self, namespace: &str) -> Option<&FinalDocument> {
        self.documents.iter().find(|d| d.namespace == namespace)
    }

    /// Distinct parent directories of every file the set was built from.
    pub fn watch_dirs(&self) -> Vec<PathBuf> {
        let dirs: std::collections::BTreeSet<PathBuf> = self
            .fragment_paths
            .iter()
            .chain(self.documents.iter().filter_map(|d| d.source.as_ref()))
            .filter_map(|path| path.parent().map(Path::to_path_buf))
            .collect();
        dirs.into_iter().collect()
    }
}

/// Builds document sets for a project.
pub struct DocumentBuilder<'a> {
    config: &'a SeedMapConfig,
    model: &'a ModelRegistry,
    fills: &'a FillRegistry,
    project_root: &'a Path,
    renderer: TemplateRenderer,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(
        config: &'a SeedMapConfig,
        model: &'a ModelRegistry,
        fills: &'a FillRegistry,
        project_root: &'a Path,
    ) -> Self {
        Self {
            config,
            model,
            fills,
            project_root,
            renderer: TemplateRenderer::new(),
        }
    }

    fn shared_path(&self) -> PathBuf {
        self.config.resolve_path(self.project_root, &self.config.common_sql_path)
    }

    /// Read the fragments matching `mapper_locations`, excluding the shared fragment.
    pub fn discover(&self) -> Result<MergeSession> {
        let shared = self.shared_path();
        let fragments = discover_files(&self.config.mapper_locations, self.project_root)?
            .into_iter()
            .filter(|path| path != &shared)
            .map(|path| MappingFragment::from_file(&path))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("Discovered {} mapper fragments", fragments.len());
        Ok(MergeSession::new(fragments))
    }

    /// Discover fragments and build with the configured packages and dialect.
    pub fn build_project(&self) -> Result<DocumentSet> {
        let session = self.discover().map_err(MapperError::into_build_error)?;
        self.build(&self.config.base_packages, session, self.config.dialect)
    }

    /// Build the final document set. The session is consumed by the pass.
    pub fn build(&self, base_packages: &[String], session: MergeSession, dialect: Dialect) -> Result<DocumentSet> {
        let set = self
            .build_inner(base_packages, session, dialect)
            .map_err(MapperError::into_build_error)?;
        tracing::info!(
            "Built {} mapper documents ({} primary keys)",
            set.documents.len(),
            set.primary_keys.len()
        );
        self.save_documents(&set);
        Ok(set)
    }

    fn build_inner(&self, base_packages: &[String], session: MergeSession, dialect: Dialect) -> Result<DocumentSet> {
        let template = resolve_template(dialect, &self.config.templates, self.project_root)?;
        let extractor = MetadataExtractor::new(self.model, self.config, self.fills);

        let mappers = self.model.mappers_under(base_packages);
        let session = session
            .with_reserved_filenames(mappers.iter().map(|m| format!("{}{XML_SUFFIX}", m.simple_name())));

        let mut documents = Vec::new();
        let mut primary_keys = PrimaryKeyTable::default();

        for mapper in mappers {
            let (rendered, origin) = match extractor.extract(mapper) {
                Ok(metadata) => {
                    if let Some(key) = &metadata.primary_key {
                        primary_keys.record(
                            &metadata.entity_name,
                            PrimaryKeyInfo {
                                key_column: key.column_name.clone(),
                                key_member: key.member_name.clone(),
                            },
                        );
                    }
                    let context = RenderContext::new(mapper, &metadata, &self.config.count_expression)?;
                    (self.renderer.render(&template.text, &context)?, DocumentOrigin::Generated)
                }
                Err(MapperError::NotAnEntityInterface { .. }) => {
                    tracing::debug!("{} has no entity type, emitting placeholder", mapper.namespace);
                    (placeholder_document(mapper), DocumentOrigin::Placeholder)
                }
                Err(e) => return Err(e),
            };

            let merged = merge(&mapper.namespace, mapper.simple_name(), &rendered, &session)?;
            documents.push(FinalDocument {
                resource: format!("{}{XML_SUFFIX}", mapper.namespace),
                namespace: mapper.namespace.clone(),
                content: merged.body,
                origin,
                source: None,
            });
        }

        let fragment_paths = session.source_paths();
        for leftover in session.into_leftovers() {
            tracing::debug!("Passing through unclaimed fragment {}", leftover.filename());
            documents.push(FinalDocument {
                resource: self.resource_name(&leftover),
                namespace: leftover.namespace()?,
                content: leftover.content().to_string(),
                origin: DocumentOrigin::Leftover,
                source: leftover.filepath().map(Path::to_path_buf),
            });
        }

        let shared_path = self.shared_path();
        if shared_path.is_file() {
            let shared = MappingFragment::from_file(&shared_path)?;
            documents.push(FinalDocument {
                resource: self.resource_name(&shared),
                namespace: shared.namespace()?,
                content: shared.content().to_string(),
                origin: DocumentOrigin::Shared,
                source: Some(shared_path),
            });
        } else {
            tracing::debug!("No shared fragment at {}", shared_path.display());
        }

        Ok(DocumentSet {
            documents,
            primary_keys,
            fragment_paths,
        })
    }

    /// Resource name of a hand-authored document: its path relative to the
    /// project root, so equal filenames in different directories stay apart.
    fn resource_name(&self, fragment: &MappingFragment) -> String {
        match fragment.filepath() {
            Some(path) => {
                let relative = path.strip_prefix(self.project_root).unwrap_or(path);
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            }
            None => fragment.filename().to_string(),
        }
    }

    /// Write generated documents to `mapper_save_dir` for inspection. Failures are
    /// only logged.
    fn save_documents(&self, set: &DocumentSet) {
        let Some(dir) = &self.config.mapper_save_dir else {
            return;
        };
        let dir = self.config.resolve_path(self.project_root, dir);
        if let Err(e) = std::fs::create_dir_all(&dir) {
            tracing::warn!("Cannot create mapper save dir {}: {e}", dir.display());
            return;
        }
        for doc in set
            .documents
            .iter()
            .filter(|d| matches!(d.origin, DocumentOrigin::Generated | DocumentOrigin::Placeholder))
        {
            let path = dir.join(&doc.resource);
            match std::fs::write(&path, &doc.content) {
                Ok(()) => tracing::debug!("Saved {}", path.display()),
                Err(e) => tracing::warn!("Failed to save {}: {e}", path.display()),
            }
        }
    }
}

fn placeholder_document(mapper: &MapperDecl) -> String {
    EMPTY_MAPPER_DOCUMENT.replace("{namespace}", &mapper.namespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::EXT_MAPPER_PLACEHOLDER;
    use crate::model::{EntityDecl, FieldDecl};
    use tempfile::TempDir;

    fn model() -> ModelRegistry {
        ModelRegistry::new()
            .with_entity(
                EntityDecl::new("Order")
                    .table("t_order")
                    .field(FieldDecl::new("id", "Long"))
                    .field(FieldDecl::new("amount", "BigDecimal")),
            )
            .with_mapper(MapperDecl::new("demo.OrderMapper", "Order"))
            .with_mapper(MapperDecl::untyped("demo.RawMapper"))
    }

    #[test]
    fn test_builtin_build_with_placeholder_and_shared() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        std::fs::create_dir_all(root.join("mapper"))?;
        std::fs::create_dir_all(root.join("seedmap"))?;
        std::fs::write(
            root.join("mapper/RawMapper.xml"),
            "<mapper namespace=\"demo.RawMapper\"><select id=\"raw\">SELECT 1</select></mapper>",
        )?;
        std::fs::write(
            root.join("mapper/Stray.xml"),
            "<mapper namespace=\"nowhere.Stray\"><select id=\"stray\">SELECT 2</select></mapper>",
        )?;
        std::fs::write(
            root.join("seedmap/commonSql.xml"),
            "<mapper namespace=\"common\"><sql id=\"page\">LIMIT 10</sql></mapper>",
        )?;

        let config = SeedMapConfig {
            mapper_save_dir: Some(PathBuf::from("out")),
            ..SeedMapConfig::default()
        };
        let model = model();
        let fills = FillRegistry::new();
        let builder = DocumentBuilder::new(&config, &model, &fills, root);
        let set = builder.build_project()?;

        let namespaces: Vec<_> = set.documents.iter().map(|d| d.namespace.as_str()).collect();
        assert_eq!(namespaces, ["demo.OrderMapper", "demo.RawMapper", "nowhere.Stray", "common"]);
        let origins: Vec<_> = set.documents.iter().map(|d| d.origin).collect();
        assert_eq!(
            origins,
            [
                DocumentOrigin::Generated,
                DocumentOrigin::Placeholder,
                DocumentOrigin::Leftover,
                DocumentOrigin::Shared
            ]
        );

        let order = set.document("demo.OrderMapper").unwrap();
        assert!(order.content.contains("INSERT INTO `t_order`"));
        assert!(!order.content.contains(EXT_MAPPER_PLACEHOLDER));

        let raw = set.document("demo.RawMapper").unwrap();
        assert!(raw.content.contains("id=\"raw\""));

        assert_eq!(set.document("nowhere.Stray").unwrap().resource, "mapper/Stray.xml");
        assert_eq!(set.document("common").unwrap().resource, "seedmap/commonSql.xml");

        assert_eq!(set.primary_keys.lookup("Order").unwrap().key_column, "id");
        assert_eq!(set.fragment_paths.len(), 2);
        let mut dirs: Vec<_> = set.watch_dirs().iter().map(|d| d.file_name().unwrap().to_owned()).collect();
        dirs.sort();
        assert_eq!(dirs, ["mapper", "seedmap"]);
        assert!(root.join("out/demo.OrderMapper.xml").is_file());
        Ok(())
    }

    #[test]
    fn test_failure_is_wrapped() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let config = SeedMapConfig::default();
        let model = model();
        let fills = FillRegistry::new();
        let builder = DocumentBuilder::new(&config, &model, &fills, temp.path());
        let session = MergeSession::new(vec![MappingFragment::new("X.xml", "<mapper/>")]);

        let err = builder.build(&[], session, Dialect::MySql).unwrap_err();
        assert!(matches!(err, MapperError::DocumentBuild { .. }));
        assert!(matches!(err.root_cause(), MapperError::MissingNamespace { .. }));
        Ok(())
    }

    #[test]
    fn test_base_packages_filter() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let config = SeedMapConfig::default();
        let model = model().with_mapper(MapperDecl::untyped("other.ThingMapper"));
        let fills = FillRegistry::new();
        let builder = DocumentBuilder::new(&config, &model, &fills, temp.path());

        let set = builder.build(&["other".to_string()], MergeSession::default(), Dialect::Oracle)?;
        assert_eq!(set.namespaces(), ["other.ThingMapper"]);
        Ok(())
    }

    #[test]
    fn test_fragment_named_after_mapper_is_not_claimed_by_namespace() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        std::fs::create_dir_all(root.join("mapper"))?;
        // named after RawMapper but declaring OrderMapper's namespace
        std::fs::write(
            root.join("mapper/RawMapper.xml"),
            "<mapper namespace=\"demo.OrderMapper\"><select id=\"byName\">SELECT 1</select></mapper>",
        )?;

        let config = SeedMapConfig::default();
        let model = model();
        let fills = FillRegistry::new();
        let set = DocumentBuilder::new(&config, &model, &fills, root).build_project()?;

        assert!(!set.document("demo.OrderMapper").unwrap().content.contains("id=\"byName\""));
        assert!(set.document("demo.RawMapper").unwrap().content.contains("id=\"byName\""));
        Ok(())
    }

    #[test]
    fn test_leftovers_with_equal_filenames_keep_distinct_resources() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        for (dir, ns) in [("x", "legacy.X"), ("y", "legacy.Y")] {
            std::fs::create_dir_all(root.join("mapper").join(dir))?;
            std::fs::write(
                root.join("mapper").join(dir).join("Common.xml"),
                format!("<mapper namespace=\"{ns}\"><select id=\"q\">SELECT 1</select></mapper>"),
            )?;
        }

        let config = SeedMapConfig::default();
        let model = model();
        let fills = FillRegistry::new();
        let set = DocumentBuilder::new(&config, &model, &fills, root).build_project()?;

        assert_eq!(set.document("legacy.X").unwrap().resource, "mapper/x/Common.xml");
        assert_eq!(set.document("legacy.Y").unwrap().resource, "mapper/y/Common.xml");
        Ok(())
    }
}
