//! WebSocket handler for team live feeds.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{future, SinkExt, StreamExt};
use noted_core::{NotedError, TeamId, UserId};
use noted_hub::{drive_connection, Frame, Inbound};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::extract_token;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler for `GET /ws/teams/{team_id}`.
///
/// The token is checked before the team id is parsed, so an unauthenticated
/// caller always gets 401. Only team members are upgraded.
pub async fn ws_handler(
    Path(team_id): Path<String>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(token) = extract_token(query.token.as_deref(), &headers) else {
        return (StatusCode::UNAUTHORIZED, "Authentication token is required").into_response();
    };

    let user = match state.authorizer.authenticate(&token).await {
        Ok(user) => user,
        Err(e) => {
            debug!(error = %e, "WebSocket authentication failed");
            return (StatusCode::UNAUTHORIZED, e.to_string()).into_response();
        }
    };

    let team: TeamId = match team_id.parse() {
        Ok(team) => team,
        Err(e) => {
            debug!(user = %user, error = %e, "WebSocket request for invalid team");
            return (StatusCode::BAD_REQUEST, "Invalid Team ID").into_response();
        }
    };

    if let Err(e) = state.authorizer.check_membership(user, team).await {
        debug!(team = %team, user = %user, error = %e, "WebSocket connection refused");
        return match e {
            NotedError::Forbidden { .. } => {
                (StatusCode::FORBIDDEN, "You are not a member of this team").into_response()
            }
            e => (StatusCode::UNAUTHORIZED, e.to_string()).into_response(),
        };
    }

    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_socket(socket, state, team, user))
            .into_response(),
        Err(rejection) => {
            warn!(team = %team, error = %rejection, "Failed to upgrade connection");
            rejection.into_response()
        }
    }
}

/// Register the socket with the hub and pump it until it closes.
async fn handle_socket(socket: WebSocket, state: AppState, team: TeamId, user: UserId) {
    let (handle, queue) = state.hub.open(team);
    info!(connection = %handle.id, team = %team, user = %user, "WebSocket client connected");

    let (sender, receiver) = socket.split();
    let sink = sender.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(into_message(frame))));
    let stream = receiver.map(|msg| msg.map(from_message));

    drive_connection(state.hub.clone(), handle, queue, sink, stream).await;

    info!(connection = %handle.id, team = %team, "WebSocket client disconnected");
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.as_ref().into()),
        Frame::Close => Message::Close(None),
    }
}

fn from_message(msg: Message) -> Inbound {
    match msg {
        Message::Close(_) => Inbound::Close,
        _ => Inbound::Message,
    }
}
