//! HTTP request handlers.

use super::actor::resolve_actor;
use super::types::HealthResponse;
use super::AppState;
use crate::registration::{RegistrationOutcome, RegistrationRequest};
use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    Form, Json,
};
use std::net::SocketAddr;
use tracing::info;

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        tracked_actors: state.broker.tracker().tracked(),
    })
}

/// Handle a registration form submission.
///
/// Every classified outcome is returned with 200; the result lives in the
/// body. A form missing required fields is rejected by the extractor.
pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(request): Form<RegistrationRequest>,
) -> Json<RegistrationOutcome> {
    let actor = resolve_actor(&state.actor_source, peer, &headers);

    let outcome = state.broker.register(&actor, request).await;
    info!(actor = %actor, outcome = %outcome, "Registration request handled");

    Json(outcome)
}
