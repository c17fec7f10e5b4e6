//! Per-actor abuse tracking: failure counters and temporary blocks.

mod sweeper;
mod tracker;

pub use sweeper::spawn_sweeper;
pub use tracker::AbuseTracker;

use chrono::{DateTime, Utc};
use std::fmt;
use std::net::IpAddr;

/// Identity used for rate limiting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Actor {
    ip: IpAddr,
    fingerprint: Option<String>,
}

impl Actor {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            fingerprint: None,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fingerprint {
            Some(fp) => write!(f, "{}#{}", self.ip, fp),
            None => write!(f, "{}", self.ip),
        }
    }
}

/// Failure state for one actor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Counted failures since the last block or reset
    pub failure_count: u32,
    /// Set while the actor is blocked
    pub blocked_until: Option<DateTime<Utc>>,
    /// Time of the most recent counted failure
    pub last_failure: Option<DateTime<Utc>>,
}

impl AttemptRecord {
    pub fn is_blocked_at(&self, now: DateTime<Utc>) -> bool {
        self.blocked_until.is_some_and(|until| until > now)
    }

    /// A record with no active block whose failures have all aged out.
    pub fn is_expired_at(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        if self.is_blocked_at(now) {
            return false;
        }
        self.failure_count == 0 || self.last_failure.map_or(true, |last| now - last > window)
    }
}

/// Result of an abuse check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Blocked { until: DateTime<Utc> },
}
