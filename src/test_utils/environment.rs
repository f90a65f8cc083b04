//! Scratch projects on disk.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::fixtures::{ORDER_MODEL, order_fragment};
use crate::config::SeedMapConfig;
use crate::constants::{CONFIG_FILE_NAME, DEFAULT_MODEL_PATH};
use crate::runtime::Project;

/// A project directory that is removed when dropped.
pub struct TestProject {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestProject {
    /// An empty project.
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("project");
        fs::create_dir_all(&root)?;
        Ok(Self { temp_dir, root })
    }

    /// A project with [`ORDER_MODEL`] and a `mapper/OrderMapper.xml` fragment
    /// defining `topOrders`.
    pub fn order() -> Result<Self> {
        let project = Self::new()?;
        project.write(DEFAULT_MODEL_PATH, ORDER_MODEL)?;
        project.write("mapper/OrderMapper.xml", &order_fragment("topOrders"))?;
        Ok(project)
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn read(&self, relative: &str) -> Result<String> {
        let path = self.path(relative);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    pub fn remove(&self, relative: &str) -> Result<()> {
        fs::remove_file(self.path(relative))?;
        Ok(())
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    /// The project's `seedmap.toml`, or defaults. Ignores `SEEDMAP_CONFIG`.
    pub fn config(&self) -> Result<SeedMapConfig> {
        let path = self.path(CONFIG_FILE_NAME);
        Ok(if path.is_file() {
            SeedMapConfig::load_from(&path)?
        } else {
            SeedMapConfig::default()
        })
    }

    /// Load the project with its configuration adjusted by `adjust`.
    pub fn load_with(&self, adjust: impl FnOnce(&mut SeedMapConfig)) -> Result<Project> {
        let mut config = self.config()?;
        adjust(&mut config);
        Ok(Project::with_config(&self.root, config)?)
    }

    pub fn load(&self) -> Result<Project> {
        self.load_with(|_| {})
    }
}

impl AsRef<Path> for TestProject {
    fn as_ref(&self) -> &Path {
        &self.root
    }
}
