//! HTTP API for the registration proxy.

mod actor;
mod handlers;
mod middleware;
mod types;

pub use actor::{resolve_actor, ActorSource};
pub use handlers::*;
pub use middleware::{
    logging_middleware, rate_limit_middleware, spawn_limiter_cleanup, ClientLimiter, RateLimitState,
};
pub use types::*;

use crate::broker::RegistrationBroker;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Registration broker
    pub broker: Arc<RegistrationBroker>,
    /// How to derive the actor from a request
    pub actor_source: Arc<ActorSource>,
}

impl AppState {
    /// Create new application state.
    pub fn new(broker: RegistrationBroker, actor_source: ActorSource) -> Self {
        Self {
            broker: Arc::new(broker),
            actor_source: Arc::new(actor_source),
        }
    }
}

/// Create the API router. Submissions are rate limited per client address.
///
/// The caller must serve it with connect info
/// (`into_make_service_with_connect_info::<SocketAddr>`).
pub fn create_router_with_rate_limit(state: AppState, rate_limit: RateLimitState) -> Router {
    let registration = Router::new()
        .route("/registration", post(handlers::register))
        .layer(axum_middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ));

    Router::new()
        // Health check (no rate limiting)
        .route("/health", get(handlers::health))
        .merge(registration)
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
