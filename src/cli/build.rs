//! `seedmap build`: synthesize the document set once.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::{CliConfig, display_path};
use crate::runtime::SeedMapper;
use crate::templating::Dialect;

#[derive(Args)]
pub struct BuildCommand {
    /// Write every final document into this directory
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Override the configured dialect (mysql, oracle, sqlserver, postgresql)
    #[arg(long)]
    pub dialect: Option<Dialect>,

    /// Namespace prefix to build; repeatable. Defaults to `base_packages`
    #[arg(long = "package", value_name = "PREFIX")]
    pub packages: Vec<String>,
}

impl BuildCommand {
    pub fn execute(self, cli: &CliConfig) -> Result<()> {
        let project = cli.load_project(|config| {
            if let Some(dialect) = self.dialect {
                config.dialect = dialect;
            }
            if !self.packages.is_empty() {
                config.base_packages = self.packages.clone();
            }
        })?;
        let mapper = SeedMapper::from_project(project)?;
        let state = mapper.registry().snapshot();
        let documents = mapper.documents();

        for doc in &documents.documents {
            println!(
                "  {:<11} {} ({} statements)",
                doc.origin.as_str().dimmed(),
                doc.namespace,
                state.statements_in(&doc.namespace).count()
            );
        }

        if let Some(dir) = &self.output {
            let dir = cli.project_root.join(dir);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
            for doc in &documents.documents {
                let path = dir.join(&doc.resource);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .with_context(|| format!("Failed to create {}", parent.display()))?;
                }
                std::fs::write(&path, &doc.content)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
            }
            println!(
                "{} Wrote {} documents to {}",
                "✓".green(),
                documents.documents.len(),
                display_path(&cli.project_root, &dir)
            );
        }

        println!(
            "{} Built {} documents with {} statements",
            "✓".green(),
            documents.documents.len(),
            state.statements.len()
        );
        Ok(())
    }
}
