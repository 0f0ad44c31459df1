//! Server and hub configuration.
//!
//! Loaded from an optional TOML file, then overridden by `NOTED_*`
//! environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{NotedError, NotedResult};
use crate::model::{TeamId, UserId};

/// Default bind address.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default size of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotedConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub hub: HubConfig,
    /// Development membership table for the static authorizer.
    #[serde(default)]
    pub members: Vec<MemberToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HubConfig {
    /// Frames a connection may have queued before it is treated as dead.
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: default_outbound_capacity(),
        }
    }
}

/// A bearer token and the teams its user belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberToken {
    pub token: String,
    pub user_id: UserId,
    #[serde(default)]
    pub teams: Vec<TeamId>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_outbound_capacity() -> usize {
    DEFAULT_OUTBOUND_CAPACITY
}

impl NotedConfig {
    /// Load configuration from `path` (if it exists) and the environment.
    pub fn load(path: Option<&Path>) -> NotedResult<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Like [`NotedConfig::load`], reading overrides through `var`.
    pub fn load_with_env(
        path: Option<&Path>,
        var: impl Fn(&str) -> Option<String>,
    ) -> NotedResult<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "Loading config file");
                Self::from_toml(&std::fs::read_to_string(path)?)?
            }
            Some(path) => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env(var)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document.
    pub fn from_toml(raw: &str) -> NotedResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> NotedResult<String> {
        toml::to_string_pretty(self).map_err(|e| NotedError::config(e.to_string()))
    }

    /// Apply `NOTED_HOST`, `NOTED_PORT` and `NOTED_OUTBOUND_CAPACITY` overrides.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> NotedResult<()> {
        if let Some(host) = var("NOTED_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("NOTED_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| NotedError::config(format!("NOTED_PORT is not a port: {port}")))?;
        }
        if let Some(capacity) = var("NOTED_OUTBOUND_CAPACITY") {
            self.hub.outbound_capacity = capacity.parse().map_err(|_| {
                NotedError::config(format!("NOTED_OUTBOUND_CAPACITY is not a number: {capacity}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> NotedResult<()> {
        if self.hub.outbound_capacity == 0 {
            return Err(NotedError::config("hub.outbound_capacity must be at least 1"));
        }
        if self.server.host.trim().is_empty() {
            return Err(NotedError::config("server.host must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NotedConfig::default();
        assert_eq!(config.server.addr(), "127.0.0.1:8080");
        assert_eq!(config.hub.outbound_capacity, 256);
        assert!(config.members.is_empty());
    }

    #[test]
    fn test_partial_toml() {
        let raw = r#"
            [server]
            port = 9000

            [[members]]
            token = "alice-token"
            user_id = 1
            teams = [7, 9]
        "#;
        let config = NotedConfig::from_toml(raw).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.hub.outbound_capacity, 256);
        assert_eq!(config.members[0].teams, vec![TeamId(7), TeamId(9)]);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = NotedConfig::default();
        config
            .apply_env(|key| match key {
                "NOTED_PORT" => Some("3031".to_string()),
                "NOTED_OUTBOUND_CAPACITY" => Some("8".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.server.port, 3031);
        assert_eq!(config.hub.outbound_capacity, 8);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_bad_env_port() {
        let mut config = NotedConfig::default();
        let err = config
            .apply_env(|key| (key == "NOTED_PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert!(matches!(err, NotedError::Config(_)));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = NotedConfig::default();
        config.hub.outbound_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("noted-config-that-does-not-exist.toml");
        let config = NotedConfig::load_with_env(Some(&path), |_| None).unwrap();
        assert_eq!(config, NotedConfig::default());
    }

    #[test]
    fn test_load_applies_injected_env() {
        let path = std::env::temp_dir().join("noted-config-that-does-not-exist.toml");
        let config = NotedConfig::load_with_env(Some(&path), |key| {
            (key == "NOTED_OUTBOUND_CAPACITY").then(|| "16".to_string())
        })
        .unwrap();
        assert_eq!(config.hub.outbound_capacity, 16);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_load_rejects_zero_capacity_from_env() {
        let err = NotedConfig::load_with_env(None, |key| {
            (key == "NOTED_OUTBOUND_CAPACITY").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, NotedError::Config(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = NotedConfig::default();
        config.members.push(MemberToken {
            token: "t".to_string(),
            user_id: UserId(2),
            teams: vec![TeamId(5)],
        });
        let rendered = config.to_toml().unwrap();
        assert_eq!(NotedConfig::from_toml(&rendered).unwrap(), config);
    }
}
