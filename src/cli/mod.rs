//! Command-line interface for seedmap.
//!
//! Commands:
//!
//! - `build` - synthesize every mapping document, load it into a registry to
//!   check for duplicates, and optionally write the documents to a directory
//! - `watch` - bootstrap and keep the registry in sync with fragment files
//! - `inspect` - show the final document or the statements of one namespace
//!
//! Global flags select the project root, an explicit configuration file and the
//! verbosity. `--verbose` and `--quiet` are mutually exclusive; `RUST_LOG` is
//! honoured when neither is given.

mod build;
mod inspect;
mod watch;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::SeedMapConfig;
use crate::runtime::Project;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive. `None` keeps `RUST_LOG` (or silence when unset).
    pub log_level: Option<String>,
    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
    pub project_root: PathBuf,
}

impl CliConfig {
    /// Install the global tracing subscriber. Later calls are no-ops.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(format!("seedmap={level}")),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Load the project's configuration, preferring `--config`.
    pub fn load_config(&self) -> Result<SeedMapConfig> {
        let config = match &self.config_path {
            Some(path) => SeedMapConfig::load_from(path),
            None => SeedMapConfig::load(&self.project_root),
        };
        config.with_context(|| format!("Failed to load configuration for {}", self.project_root.display()))
    }

    /// Load the project with an adjusted configuration.
    pub fn load_project(&self, adjust: impl FnOnce(&mut SeedMapConfig)) -> Result<Project> {
        let mut config = self.load_config()?;
        adjust(&mut config);
        Ok(Project::with_config(&self.project_root, config)?)
    }
}

#[derive(Parser)]
#[command(
    name = "seedmap",
    about = "Synthesize and live-reload SQL mapping documents",
    version,
    long_about = "seedmap renders dialect templates from entity declarations, merges \
                  hand-written mapper fragments into them and keeps a statement registry \
                  in sync with the files on disk."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file (defaults to `<project>/seedmap.toml` or `SEEDMAP_CONFIG`)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Project root directory
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every mapping document
    Build(build::BuildCommand),

    /// Watch fragment files and reload on change
    Watch(watch::WatchCommand),

    /// Show the document or statements of one namespace
    Inspect(inspect::InspectCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else if std::env::var_os("RUST_LOG").is_some() {
            None
        } else {
            Some("info".to_string())
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
            project_root: self.project.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Build(cmd) => cmd.execute(&config),
            Commands::Watch(cmd) => cmd.execute(&config).await,
            Commands::Inspect(cmd) => cmd.execute(&config),
        }
    }
}

/// Display a path relative to the project root when possible.
fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
