//! Configuration management for seedmap
//!
//! A project is configured through `seedmap.toml` in the project root (or the file
//! named by the `SEEDMAP_CONFIG` environment variable). Every field has a default,
//! so an empty file is a valid configuration.
//!
//! # File Format
//!
//! ```toml
//! model = "model.toml"
//! base_packages = ["demo"]
//! mapper_locations = ["mapper/**/*.xml"]
//! dialect = "mysql"
//! global_id_name = "id"
//! ignore_update_columns = ["gmt_create"]
//! mapper_save_dir = "target/mappers"
//!
//! [templates]
//! dir = "templates"
//! global = "templates/global.tera"
//!
//! [hot_reload]
//! enabled = true
//! debounce_ms = 300
//!
//! [[fills]]
//! handler = "gmtCreate"
//! column = "gmt_create"
//! phase = "insert"
//! supplier = "timestamp"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    CONFIG_ENV_VAR, CONFIG_FILE_NAME, DEFAULT_COMMON_SQL_PATH, DEFAULT_DEBOUNCE_MS,
    DEFAULT_MODEL_PATH, DEFAULT_POLL_INTERVAL_MS,
};
use crate::core::{MapperError, Result};
use crate::metadata::fill::FillPhase;
use crate::templating::Dialect;

/// Project configuration for document synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeedMapConfig {
    /// Model file declaring mappers, entities and enums, relative to the project root.
    pub model: PathBuf,

    /// Namespace prefixes whose mappers take part in the build.
    ///
    /// An empty list selects every declared mapper.
    pub base_packages: Vec<String>,

    /// Glob patterns, relative to the project root, locating hand-authored fragments.
    pub mapper_locations: Vec<String>,

    /// SQL dialect selecting the document template.
    pub dialect: Dialect,

    /// Convert member and entity names to `snake_case` column and table names.
    pub camel_to_underline: bool,

    /// Column name treated as the primary key when an entity names none.
    pub global_id_name: String,

    /// Whether a conventionally named key is auto-increment.
    pub global_id_increment: bool,

    /// Stored value of a logically deleted row.
    pub logic_delete_value: String,

    /// Stored value of a live row.
    pub logic_not_delete_value: String,

    /// Columns never written by update statements, e.g. `gmt_create`.
    pub ignore_update_columns: Vec<String>,

    /// Associations fetch through `forceById` instead of `getById`.
    pub ignore_logic_delete_with_association: bool,

    /// Expression used by generated count statements.
    pub count_expression: String,

    /// Shared fragment appended after every build, relative to the project root.
    pub common_sql_path: PathBuf,

    /// Directory receiving a copy of every generated document. Write-only.
    pub mapper_save_dir: Option<PathBuf>,

    /// Type handler bound to enumeration columns.
    pub enum_type_handler: String,

    /// Template resolution settings.
    pub templates: TemplateConfig,

    /// Live reload settings.
    pub hot_reload: HotReloadConfig,

    /// Declarative fill handlers.
    pub fills: Vec<FillConfig>,
}

impl Default for SeedMapConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from(DEFAULT_MODEL_PATH),
            base_packages: Vec::new(),
            mapper_locations: vec!["mapper/**/*.xml".to_string()],
            dialect: Dialect::MySql,
            camel_to_underline: true,
            global_id_name: "id".to_string(),
            global_id_increment: true,
            logic_delete_value: "1".to_string(),
            logic_not_delete_value: "0".to_string(),
            ignore_update_columns: Vec::new(),
            ignore_logic_delete_with_association: false,
            count_expression: "count(*)".to_string(),
            common_sql_path: PathBuf::from(DEFAULT_COMMON_SQL_PATH),
            mapper_save_dir: None,
            enum_type_handler: "EnumTypeHandler".to_string(),
            templates: TemplateConfig::default(),
            hot_reload: HotReloadConfig::default(),
            fills: Vec::new(),
        }
    }
}

/// Where dialect templates come from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplateConfig {
    /// Directory searched first for `<dialect>.tera`; defaults to the project root.
    pub override_dir: Option<PathBuf>,
    /// Configured template directory, searched second.
    pub dir: Option<PathBuf>,
    /// Global template spliced into every dialect template.
    pub global: Option<PathBuf>,
}

/// Live reload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HotReloadConfig {
    /// Start the watcher after bootstrap.
    pub enabled: bool,
    /// Quiet period collecting change events before a rebuild.
    pub debounce_ms: u64,
    /// Interval between file system polls.
    pub poll_interval_ms: u64,
}

impl Default for HotReloadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl HotReloadConfig {
    /// Debounce window.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Poll interval, never shorter than 10 ms.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}

/// Declarative fill handler entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FillConfig {
    /// Handler identifier bound to matching columns.
    pub handler: String,
    /// Column (or member) name the handler applies to.
    pub column: String,
    /// Statement phase the handler supplies values for.
    pub phase: FillPhase,
    /// Entities the handler is limited to; empty means all.
    #[serde(default)]
    pub entities: Vec<String>,
    /// Lower values win.
    #[serde(default = "default_fill_priority")]
    pub priority: i32,
    /// Built-in value supplier: `timestamp`, `uuid`, or none.
    #[serde(default)]
    pub supplier: Option<String>,
}

const fn default_fill_priority() -> i32 {
    i32::MAX
}

impl SeedMapConfig {
    /// Load the configuration for a project.
    ///
    /// Uses `SEEDMAP_CONFIG` when set, else `<project_root>/seedmap.toml`, else
    /// the defaults.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => PathBuf::from(expand_path(&path)),
            _ => project_root.join(CONFIG_FILE_NAME),
        };

        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load the configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| MapperError::io("read config", path, e))?;
        let config: Self = toml::from_str(&content).map_err(|source| MapperError::Toml {
            file: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.global_id_name.trim().is_empty() {
            return Err(MapperError::ConfigError {
                message: "global_id_name must not be empty".to_string(),
            });
        }
        for fill in &self.fills {
            if fill.column.trim().is_empty() || fill.handler.trim().is_empty() {
                return Err(MapperError::ConfigError {
                    message: format!("fill '{}' needs both handler and column", fill.handler),
                });
            }
        }
        Ok(())
    }

    /// Resolve a configured path against the project root, expanding `~`.
    #[must_use]
    pub fn resolve_path(&self, project_root: &Path, path: &Path) -> PathBuf {
        let expanded = PathBuf::from(expand_path(&path.to_string_lossy()));
        if expanded.is_absolute() {
            expanded
        } else {
            project_root.join(expanded)
        }
    }
}

fn expand_path(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = SeedMapConfig::default();
        assert_eq!(config.global_id_name, "id");
        assert!(config.global_id_increment);
        assert!(config.camel_to_underline);
        assert!(!config.hot_reload.enabled);
        assert_eq!(config.dialect, Dialect::MySql);
    }

    #[test]
    fn test_parse_full_file() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("seedmap.toml");
        std::fs::write(
            &path,
            r#"
base_packages = ["demo"]
dialect = "postgresql"
ignore_update_columns = ["gmt_create"]

[templates]
dir = "tpl"

[hot_reload]
enabled = true
debounce_ms = 50

[[fills]]
handler = "gmtCreate"
column = "gmt_create"
phase = "insert"
supplier = "timestamp"
"#,
        )?;

        let config = SeedMapConfig::load_from(&path)?;
        assert_eq!(config.base_packages, vec!["demo"]);
        assert_eq!(config.dialect, Dialect::PostgreSql);
        assert!(config.hot_reload.enabled);
        assert_eq!(config.hot_reload.debounce(), Duration::from_millis(50));
        assert_eq!(config.fills.len(), 1);
        assert_eq!(config.fills[0].phase, FillPhase::Insert);
        assert_eq!(config.fills[0].priority, i32::MAX);
        Ok(())
    }

    #[test]
    fn test_unknown_field_is_rejected() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("seedmap.toml");
        std::fs::write(&path, "no_such_field = 1\n")?;

        let err = SeedMapConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, MapperError::Toml { .. }));
        Ok(())
    }

    #[test]
    #[serial]
    fn test_env_var_overrides_location() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("custom.toml");
        std::fs::write(&path, "global_id_name = \"pk\"\n")?;

        // SAFETY: serialized test, no other thread reads the environment
        unsafe { std::env::set_var(CONFIG_ENV_VAR, &path) };
        let loaded = SeedMapConfig::load(Path::new("/nonexistent"));
        unsafe { std::env::remove_var(CONFIG_ENV_VAR) };

        assert_eq!(loaded?.global_id_name, "pk");
        Ok(())
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let config = SeedMapConfig::load(temp.path())?;
        assert_eq!(config.common_sql_path, PathBuf::from(DEFAULT_COMMON_SQL_PATH));
        Ok(())
    }
}
