//! Centralized error types for Noted.

use thiserror::Error;

use crate::model::{TeamId, UserId};

/// Main error type for Noted operations.
///
/// The hub itself never surfaces errors to its callers; these exist at the
/// configuration, authorization and client boundaries around it.
#[derive(Error, Debug)]
pub enum NotedError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid team id: {0}")]
    InvalidTeamId(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("User {user_id} is not a member of team {team_id}")]
    Forbidden { user_id: UserId, team_id: TeamId },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for Noted operations.
pub type NotedResult<T> = Result<T, NotedError>;

impl NotedError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unauthorized error.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }
}
