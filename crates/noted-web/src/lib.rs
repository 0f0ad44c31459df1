//! Noted Web Server
//!
//! Axum-based server exposing the team live feed over WebSocket and the
//! internal publish endpoint that feeds it.

pub mod auth;
pub mod routes;
pub mod state;
pub mod websocket;

use axum::{
    routing::{get, post},
    Router,
};
use noted_core::config::NotedConfig;
use noted_hub::Hub;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use auth::StaticAuthorizer;
use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let internal_routes = Router::new()
        .route("/teams/{team_id}/events", post(routes::internal::publish))
        .route("/stats", get(routes::internal::stats))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/ws/teams/{team_id}", get(websocket::ws_handler))
        .nest("/internal", internal_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Run the web server until Ctrl+C, then stop the hub.
pub async fn run_server(config: NotedConfig) -> anyhow::Result<()> {
    let authorizer = StaticAuthorizer::new(config.members.clone());
    if authorizer.is_empty() {
        warn!("No members configured, every WebSocket connection will be refused");
    }

    let hub = Hub::start(config.hub);
    let state = AppState::new(hub.handle(), Arc::new(authorizer));
    let app = create_router(state);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Web server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web server stopped, shutting down hub");
    hub.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use noted_core::config::{HubConfig, MemberToken};
    use noted_core::{TeamId, UserId};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> (Hub, Router) {
        let hub = Hub::start(HubConfig {
            outbound_capacity: 8,
        });
        let authorizer = StaticAuthorizer::new([MemberToken {
            token: "alice".to_string(),
            user_id: UserId(1),
            teams: vec![TeamId(7)],
        }]);
        let state = AppState::new(hub.handle(), Arc::new(authorizer));
        (hub, create_router(state))
    }

    fn ws_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::CONNECTION, "upgrade")
            .header(header::UPGRADE, "websocket")
            .header(header::SEC_WEBSOCKET_VERSION, "13")
            .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (_hub, app) = test_app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_publish_reaches_team_members_only() {
        let (hub, app) = test_app();
        let handle = hub.handle();
        let (_member, mut member_queue) = handle.open(TeamId(7));
        let (_other, mut other_queue) = handle.open(TeamId(9));

        let response = app
            .oneshot(
                Request::post("/internal/teams/7/events")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"event":"todo_created","data":{"id":1}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        handle.snapshot().await;
        assert_eq!(
            member_queue.try_recv().as_deref(),
            Some(r#"{"event":"todo_created","data":{"id":1}}"#)
        );
        assert_eq!(other_queue.try_recv(), None);
    }

    #[tokio::test]
    async fn test_publish_rejects_bad_team_id() {
        let (_hub, app) = test_app();
        let response = app
            .oneshot(
                Request::post("/internal/teams/abc/events")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"event":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stats() {
        let (hub, app) = test_app();
        let handle = hub.handle();
        let _a = handle.open(TeamId(7));
        let _b = handle.open(TeamId(7));
        let _c = handle.open(TeamId(9));

        let response = app
            .oneshot(Request::get("/internal/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let stats: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            stats,
            json!({ "teams": 2, "connections": 3, "members": { "7": 2, "9": 1 } })
        );
    }

    #[tokio::test]
    async fn test_ws_requires_token() {
        let (_hub, app) = test_app();
        let response = app.oneshot(ws_request("/ws/teams/7")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_ws_rejects_unknown_token() {
        let (_hub, app) = test_app();
        let response = app
            .oneshot(ws_request("/ws/teams/7?token=mallory"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_ws_rejects_non_member() {
        let (_hub, app) = test_app();
        let response = app
            .oneshot(ws_request("/ws/teams/9?token=alice"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_ws_bad_team_id_without_token_is_unauthorized() {
        let (_hub, app) = test_app();
        let response = app.oneshot(ws_request("/ws/teams/abc")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_ws_bad_team_id_with_unknown_token_is_unauthorized() {
        let (_hub, app) = test_app();
        let response = app
            .oneshot(ws_request("/ws/teams/abc?token=mallory"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_ws_bad_team_id_with_valid_token_is_bad_request() {
        let (_hub, app) = test_app();
        let response = app
            .oneshot(ws_request("/ws/teams/abc?token=alice"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ws_member_passes_authorization() {
        let (hub, app) = test_app();
        // No real connection to upgrade in a oneshot request, so the upgrade
        // itself is refused after authorization succeeded.
        let response = app
            .oneshot(ws_request("/ws/teams/7?token=alice"))
            .await
            .unwrap();
        let status = response.status();
        assert_ne!(status, StatusCode::UNAUTHORIZED);
        assert_ne!(status, StatusCode::FORBIDDEN);
        assert!(status.is_client_error());
        assert!(hub.handle().snapshot().await.teams.is_empty());
    }
}
