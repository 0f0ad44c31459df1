//! Web server command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use noted_core::config::NotedConfig;
use std::path::PathBuf;
use tracing::debug;

#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides the config file)
    #[arg(long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides the config file)
    #[arg(long)]
    pub host: Option<String>,

    /// Also write logs to a file
    #[arg(long)]
    pub log: bool,

    /// Log file path used with --log
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs, mut config: NotedConfig) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate()?;
    debug!(
        outbound_capacity = config.hub.outbound_capacity,
        members = config.members.len(),
        "Effective configuration"
    );

    let addr = config.server.addr();
    println!();
    println!("  {} {}", "Noted".cyan().bold(), "Notification Server".bold());
    println!();
    println!("  {}  ws://{}/ws/teams/{{team_id}}?token=...", "WebSocket".green(), addr);
    println!("  {}    POST http://{}/internal/teams/{{team_id}}/events", "Publish".green(), addr);
    println!("  {}      GET  http://{}/internal/stats", "Stats".green(), addr);
    println!();
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    noted_web::run_server(config).await
}
