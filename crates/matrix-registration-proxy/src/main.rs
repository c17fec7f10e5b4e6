//! Matrix Registration Proxy - Entry point.

use matrix_registration_proxy::{
    abuse::{spawn_sweeper, AbuseTracker},
    api::{
        create_router_with_rate_limit, spawn_limiter_cleanup, ActorSource, AppState, RateLimitState,
    },
    config::Config,
    RegistrationBroker, Validator,
};
use secrecy::ExposeSecret;
use std::net::SocketAddr;
use std::sync::Arc;
use synapse_admin_client::SynapseAdminClient;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));
    let json = config.log.format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    info!(homeserver = %config.matrix_server, "Starting Matrix Registration Proxy");

    // Initialize homeserver client
    let homeserver = match SynapseAdminClient::new(
        config.matrix_server.clone(),
        config.matrix_shared_secret.expose_secret().clone(),
        config.homeserver.timeout,
    ) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create homeserver client: {}", e);
            std::process::exit(1);
        }
    };

    let actor_source = match ActorSource::from_config(&config.server) {
        Ok(s) => s,
        Err(e) => {
            error!("Invalid server configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Abuse tracking with periodic cleanup
    let tracker = Arc::new(AbuseTracker::new(&config.abuse));
    spawn_sweeper(tracker.clone(), config.abuse.sweep_interval);
    info!(
        threshold = config.abuse.threshold,
        block_duration = ?config.abuse.block_duration,
        "Abuse tracking enabled"
    );

    let broker = RegistrationBroker::new(
        Validator::new(&config.matrix_token, config.validation.min_password_length),
        tracker,
        Arc::new(homeserver),
        config.abuse.count_user_exists,
    );

    // Create application state
    let state = AppState::new(broker, actor_source);

    // Per-client rate limiter from config
    let rate_limit = RateLimitState::new(
        config.rate_limit.per_client_per_minute,
        state.actor_source.clone(),
    );
    spawn_limiter_cleanup(rate_limit.clone(), config.abuse.sweep_interval);

    // Create router with rate limiting
    let app = create_router_with_rate_limit(state, rate_limit);

    // Bind to address
    let addr = match config.server.socket_addr() {
        Ok(a) => a,
        Err(e) => {
            error!("Invalid server configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Run server
    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
