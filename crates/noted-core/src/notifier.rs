//! Web server notifier for out-of-process publishers.
//!
//! Mutation handlers that do not share a process with the hub use this to
//! hand events to the running server, which fans them out to the team.

use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{NotedError, NotedResult};
use crate::event::{PublishRequest, TodoEvent};
use crate::model::TeamId;

/// Default web server URL.
const DEFAULT_WEB_URL: &str = "http://127.0.0.1:8080";

/// Publishes events to the web server via HTTP.
#[derive(Clone)]
pub struct WebNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl WebNotifier {
    /// Create a new notifier with default settings.
    ///
    /// Uses the `NOTED_WEB_URL` environment variable if set,
    /// otherwise defaults to `http://127.0.0.1:8080`.
    pub fn new() -> Self {
        let base_url =
            std::env::var("NOTED_WEB_URL").unwrap_or_else(|_| DEFAULT_WEB_URL.to_string());
        Self::with_url(&base_url)
    }

    /// Create a notifier with a custom base URL.
    pub fn with_url(base_url: &str) -> Self {
        debug!(base_url = %base_url, "WebNotifier initialized");
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn publish_url(&self, team: TeamId) -> String {
        format!("{}/internal/teams/{}/events", self.base_url, team)
    }

    /// Publish an event to every connected member of `team`.
    ///
    /// Returns once the server has accepted the event, not once it is delivered.
    pub async fn publish(
        &self,
        team: TeamId,
        kind: &str,
        data: impl Serialize,
    ) -> NotedResult<()> {
        let url = self.publish_url(team);
        let body = PublishRequest {
            event: kind.to_string(),
            data: serde_json::to_value(data)?,
        };

        debug!(url = %url, team = %team, event = %kind, "Sending publish request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotedError::Http(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotedError::Http(format!(
                "publish to {} failed with status {}",
                url,
                response.status()
            )))
        }
    }

    /// Publish a todo mutation, logging instead of failing.
    pub async fn notify_todo(&self, team: TeamId, event: TodoEvent) {
        let kind = event.kind();
        let result = match event.into_event(team) {
            Ok(event) => self.publish(team, kind, event.data()).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            // Expected when the server is not running.
            debug!(team = %team, event = %kind, error = %e, "Todo notification not delivered");
        }
    }
}

impl Default for WebNotifier {
    fn default() -> Self {
        Self::new()
    }
}
