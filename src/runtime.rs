//! Runtime facade.
//!
//! [`SeedMapper`] wires configuration, declarations, fill handlers, the live
//! registry and the hot-reload watcher together. Bootstrap is fail-fast: any
//! error in the initial build aborts it, whereas later reload failures are only
//! logged by the watcher.
//!
//! ```rust,no_run
//! use seedmap::runtime::SeedMapper;
//! use std::path::Path;
//!
//! # async fn example() -> seedmap::core::Result<()> {
//! let mut mapper = SeedMapper::bootstrap(Path::new("."))?;
//! mapper.start_hot_reload();
//! let statement = mapper.registry().statement("demo.OrderMapper.getById");
//! # mapper.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SeedMapConfig;
use crate::core::Result;
use crate::document::{DocumentBuilder, DocumentSet};
use crate::metadata::FillRegistry;
use crate::model::ModelRegistry;
use crate::registry::LiveRegistry;
use crate::reload::{DocumentSource, HotReloadWatcher, WatcherState};

/// Everything needed to rebuild a project's document set.
#[derive(Debug)]
pub struct Project {
    pub root: PathBuf,
    pub config: SeedMapConfig,
    pub model: ModelRegistry,
    pub fills: FillRegistry,
}

impl Project {
    /// Load configuration, declarations and fill handlers from `root`.
    pub fn load(root: &Path) -> Result<Self> {
        Self::with_config(root, SeedMapConfig::load(root)?)
    }

    /// Load declarations and fill handlers for an explicit configuration.
    pub fn with_config(root: &Path, config: SeedMapConfig) -> Result<Self> {
        let model = ModelRegistry::load(&config.resolve_path(root, &config.model))?;
        let fills = FillRegistry::from_config(&config.fills)?;
        Ok(Self {
            root: root.to_path_buf(),
            config,
            model,
            fills,
        })
    }

    pub fn builder(&self) -> DocumentBuilder<'_> {
        DocumentBuilder::new(&self.config, &self.model, &self.fills, &self.root)
    }

    /// Discover fragments and build the document set.
    pub fn build(&self) -> Result<DocumentSet> {
        self.builder().build_project()
    }
}

impl DocumentSource for Project {
    fn rebuild(&self) -> Result<DocumentSet> {
        self.build()
    }
}

/// A bootstrapped project with its live registry.
pub struct SeedMapper {
    project: Arc<Project>,
    registry: Arc<LiveRegistry>,
    documents: DocumentSet,
    watcher: HotReloadWatcher,
}

impl SeedMapper {
    /// Load the project at `root`, build its documents and populate the registry.
    pub fn bootstrap(root: &Path) -> Result<Self> {
        Self::from_project(Project::load(root)?)
    }

    /// Build and register an already assembled project.
    pub fn from_project(project: Project) -> Result<Self> {
        let documents = project.build()?;
        let registry = Arc::new(LiveRegistry::new());
        registry.install(&documents)?;

        let project = Arc::new(project);
        let watcher = HotReloadWatcher::new(
            Arc::clone(&registry),
            Arc::clone(&project) as Arc<dyn DocumentSource>,
            project.config.hot_reload.clone(),
        );
        tracing::info!(
            "Bootstrapped {} with {} documents",
            project.root.display(),
            documents.documents.len()
        );
        Ok(Self {
            project,
            registry,
            documents,
            watcher,
        })
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn registry(&self) -> &Arc<LiveRegistry> {
        &self.registry
    }

    /// Documents of the bootstrap build.
    pub fn documents(&self) -> &DocumentSet {
        &self.documents
    }

    /// Start the watcher when `hot_reload.enabled` is set. Needs a tokio runtime.
    pub fn start_hot_reload(&mut self) -> WatcherState {
        self.watcher.start(&self.documents);
        self.watcher.state()
    }

    pub fn watcher_state(&self) -> WatcherState {
        self.watcher.state()
    }

    pub async fn shutdown(&mut self) {
        self.watcher.stop().await;
    }
}
