//! `seedmap watch`: keep the registry in sync until interrupted.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::{CliConfig, display_path};
use crate::runtime::SeedMapper;

#[derive(Args)]
pub struct WatchCommand {
    /// Milliseconds between file system polls
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Quiet period in milliseconds before a rebuild starts
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,
}

impl WatchCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let project = cli.load_project(|config| {
            config.hot_reload.enabled = true;
            if let Some(ms) = self.poll_interval_ms {
                config.hot_reload.poll_interval_ms = ms;
            }
            if let Some(ms) = self.debounce_ms {
                config.hot_reload.debounce_ms = ms;
            }
        })?;
        let mut mapper = SeedMapper::from_project(project)?;

        let state = mapper.start_hot_reload();
        for dir in mapper.documents().watch_dirs() {
            println!("  {} {}", "watching".dimmed(), display_path(&cli.project_root, &dir));
        }
        println!(
            "{} Hot reload {state} at registry version {}. Press Ctrl-C to stop.",
            "✓".green(),
            mapper.registry().version()
        );

        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        mapper.shutdown().await;
        println!("Stopped at registry version {}", mapper.registry().version());
        Ok(())
    }
}
