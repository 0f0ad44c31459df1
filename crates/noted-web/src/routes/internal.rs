//! Internal endpoints for mutation handlers and operators.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use noted_core::{PublishRequest, TeamId};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::state::AppState;

/// Hand an event to the hub for every connected member of `team_id`.
///
/// Returns as soon as the hub has the event; delivery happens afterwards.
pub async fn publish(
    State(state): State<AppState>,
    Path(team): Path<TeamId>,
    Json(req): Json<PublishRequest>,
) -> StatusCode {
    info!(team = %team, event = %req.event, "Received publish request");
    state.publish(req.into_event(team));
    StatusCode::ACCEPTED
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub teams: usize,
    pub connections: usize,
    pub members: BTreeMap<TeamId, usize>,
}

/// Current hub membership counts.
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let snapshot = state.hub.snapshot().await;
    let members: BTreeMap<TeamId, usize> = snapshot
        .teams
        .iter()
        .map(|(team, ids)| (*team, ids.len()))
        .collect();
    debug!(connections = snapshot.connection_count(), "Hub stats requested");

    Json(StatsResponse {
        teams: members.len(),
        connections: snapshot.connection_count(),
        members,
    })
}
