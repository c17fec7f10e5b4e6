//! Per-client submission rate limiting and request logging.

use super::actor::{resolve_actor, ActorSource};
use crate::error::ProxyError;
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Limiter keyed by client address. One client spending its quota never
/// affects another; the abuse tracker decides everything past this point.
pub type ClientLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Rate limiter state shared across requests.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<ClientLimiter>,
    pub actor_source: Arc<ActorSource>,
}

impl RateLimitState {
    /// Allow `requests_per_minute` submissions per client address (at least one).
    pub fn new(requests_per_minute: u32, actor_source: Arc<ActorSource>) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));

        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            actor_source,
        }
    }

    /// Create a permissive rate limiter for testing.
    pub fn permissive(actor_source: Arc<ActorSource>) -> Self {
        Self::new(10_000, actor_source)
    }

    /// Spend one unit of `ip`'s quota.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.limiter.check_key(&ip).is_ok()
    }

    /// Forget clients whose quota has fully replenished.
    pub fn cleanup(&self) -> usize {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        before.saturating_sub(self.limiter.len())
    }
}

/// Run [`RateLimitState::cleanup`] every `period`.
pub fn spawn_limiter_cleanup(rate_limit: RateLimitState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = rate_limit.cleanup();
            if removed > 0 {
                debug!(removed, "Dropped idle rate limit keys");
            }
        }
    })
}

/// Reject submissions with 429 once the client's quota is spent.
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ProxyError> {
    let ip = resolve_actor(&rate_limit.actor_source, peer, request.headers()).ip();

    if !rate_limit.check(ip) {
        warn!(client = %ip, "Submission rate limit exceeded");
        return Err(ProxyError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}

/// Log method, path, status and latency. Query strings and bodies are never
/// logged since they may carry credentials.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = std::time::Instant::now();

    debug!(%method, %path, "Request started");

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_success() {
        debug!(%method, %path, %status, ?duration, "Request completed");
    } else {
        warn!(%method, %path, %status, ?duration, "Request failed");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Arc<ActorSource> {
        Arc::new(ActorSource::default())
    }

    fn ip(raw: &str) -> IpAddr {
        raw.parse().unwrap()
    }

    #[test]
    fn test_rate_limit_exhaustion() {
        let state = RateLimitState::new(2, source());

        assert!(state.check(ip("198.51.100.1")));
        assert!(state.check(ip("198.51.100.1")));
        assert!(!state.check(ip("198.51.100.1")));
    }

    #[test]
    fn test_clients_have_separate_quotas() {
        let state = RateLimitState::new(1, source());

        assert!(state.check(ip("198.51.100.1")));
        assert!(!state.check(ip("198.51.100.1")));
        assert!(state.check(ip("198.51.100.2")));
        assert!(state.check(ip("2001:db8::1")));
    }

    #[test]
    fn test_zero_quota_still_allows_one() {
        let state = RateLimitState::new(0, source());
        assert!(state.check(ip("198.51.100.1")));
        assert!(!state.check(ip("198.51.100.1")));
    }

    #[test]
    fn test_permissive_rate_limit() {
        let state = RateLimitState::permissive(source());
        for _ in 0..100 {
            assert!(state.check(ip("198.51.100.1")));
        }
    }
}
