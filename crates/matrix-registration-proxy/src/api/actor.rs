//! Deriving the rate-limiting actor from a request.

use crate::abuse::Actor;
use crate::config::ServerConfig;
use anyhow::{Context, Result};
use axum::http::{HeaderMap, HeaderName};
use std::net::{IpAddr, SocketAddr};

const FORWARDED_FOR: &str = "x-forwarded-for";
const MAX_FINGERPRINT_LEN: usize = 128;

/// Which request data identifies an actor.
#[derive(Debug, Clone, Default)]
pub struct ActorSource {
    /// Use the first `X-Forwarded-For` address instead of the peer address
    pub trust_forwarded_for: bool,
    /// Header whose value refines the actor
    pub fingerprint_header: Option<HeaderName>,
}

impl ActorSource {
    pub fn from_config(server: &ServerConfig) -> Result<Self> {
        let fingerprint_header = server
            .fingerprint_header
            .as_deref()
            .map(|name| {
                HeaderName::try_from(name.to_ascii_lowercase())
                    .with_context(|| format!("Invalid fingerprint header name: {}", name))
            })
            .transpose()?;

        Ok(Self {
            trust_forwarded_for: server.trust_forwarded_for,
            fingerprint_header,
        })
    }
}

/// Build the actor for a request from the peer address and headers.
pub fn resolve_actor(source: &ActorSource, peer: SocketAddr, headers: &HeaderMap) -> Actor {
    let ip = if source.trust_forwarded_for {
        forwarded_for(headers).unwrap_or_else(|| peer.ip())
    } else {
        peer.ip()
    };

    let fingerprint = source
        .fingerprint_header
        .as_ref()
        .and_then(|name| headers.get(name))
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|fp| !fp.is_empty() && fp.len() <= MAX_FINGERPRINT_LEN);

    match fingerprint {
        Some(fp) => Actor::new(ip).with_fingerprint(fp),
        None => Actor::new(ip),
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .and_then(|first| first.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "203.0.113.9:51234".parse().unwrap()
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_peer_address_by_default() {
        let h = headers(&[("x-forwarded-for", "198.51.100.1")]);
        let actor = resolve_actor(&ActorSource::default(), peer(), &h);
        assert_eq!(actor, Actor::new(peer().ip()));
    }

    #[test]
    fn test_forwarded_for_when_trusted() {
        let source = ActorSource {
            trust_forwarded_for: true,
            fingerprint_header: None,
        };

        let h = headers(&[("x-forwarded-for", "198.51.100.1, 10.0.0.1")]);
        assert_eq!(
            resolve_actor(&source, peer(), &h).ip(),
            "198.51.100.1".parse::<IpAddr>().unwrap()
        );

        let garbage = headers(&[("x-forwarded-for", "not-an-ip")]);
        assert_eq!(resolve_actor(&source, peer(), &garbage).ip(), peer().ip());
    }

    #[test]
    fn test_fingerprint_header() {
        let source = ActorSource::from_config(&ServerConfig {
            fingerprint_header: Some("X-Client-Fingerprint".into()),
            ..ServerConfig::default()
        })
        .unwrap();

        let h = headers(&[("x-client-fingerprint", "abc123")]);
        let actor = resolve_actor(&source, peer(), &h);
        assert_eq!(actor.fingerprint(), Some("abc123"));

        let actor = resolve_actor(&source, peer(), &HeaderMap::new());
        assert_eq!(actor.fingerprint(), None);
    }

    #[test]
    fn test_oversized_fingerprint_ignored() {
        let source = ActorSource {
            trust_forwarded_for: false,
            fingerprint_header: Some(HeaderName::from_static("x-client-fingerprint")),
        };
        let long = "a".repeat(MAX_FINGERPRINT_LEN + 1);
        let mut h = HeaderMap::new();
        h.insert("x-client-fingerprint", HeaderValue::from_str(&long).unwrap());

        assert_eq!(resolve_actor(&source, peer(), &h).fingerprint(), None);
    }
}
