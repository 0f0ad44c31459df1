//! Print the effective configuration.

use anyhow::Result;
use noted_core::config::NotedConfig;

pub fn execute(config: &NotedConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
