//! Publish an event through a running server.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use noted_core::notifier::WebNotifier;
use noted_core::TeamId;
use serde_json::Value;

#[derive(Args)]
pub struct NotifyArgs {
    /// Team whose members receive the event
    #[arg(long)]
    pub team: TeamId,

    /// Event name, e.g. todo_created
    #[arg(long)]
    pub event: String,

    /// Event payload as JSON
    #[arg(long, default_value = "null")]
    pub data: String,

    /// Server base URL
    #[arg(long, env = "NOTED_WEB_URL")]
    pub url: Option<String>,
}

pub async fn execute(args: NotifyArgs) -> Result<()> {
    let data: Value = serde_json::from_str(&args.data).context("--data is not valid JSON")?;

    let notifier = match &args.url {
        Some(url) => WebNotifier::with_url(url),
        None => WebNotifier::new(),
    };

    notifier
        .publish(args.team, &args.event, &data)
        .await
        .with_context(|| format!("Failed to publish to {}", notifier.base_url()))?;

    println!(
        "{} {} {} {}",
        "Published".green().bold(),
        args.event.cyan(),
        "to team".dimmed(),
        args.team
    );
    Ok(())
}
