//! CLI command definitions and handlers.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use noted_core::config::NotedConfig;
use std::path::{Path, PathBuf};

pub mod config;
pub mod notify;
pub mod serve;

/// Noted - live team notifications
#[derive(Parser)]
#[command(name = "noted")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "NOTED_CONFIG", default_value = "noted.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server and notification hub
    Serve(serve::ServeArgs),

    /// Publish an event to a team through a running server
    Notify(notify::NotifyArgs),

    /// Print the effective configuration
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve(args) => serve::execute(args, load_config(&self.config)?).await,
            Commands::Notify(args) => notify::execute(args).await,
            Commands::Config => config::execute(&load_config(&self.config)?),
        }
    }
}

fn load_config(path: &Path) -> Result<NotedConfig> {
    NotedConfig::load(Some(path))
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
