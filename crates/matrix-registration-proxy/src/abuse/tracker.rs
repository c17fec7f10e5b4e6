//! In-memory abuse tracker backed by a sharded concurrent map.

use super::{Actor, AttemptRecord, Verdict};
use crate::config::AbuseConfig;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-actor failure counters and blocks.
///
/// Every mutation of a record happens under the map's entry lock for that
/// actor, so concurrent submissions from the same actor serialize while other
/// actors proceed independently.
pub struct AbuseTracker {
    records: DashMap<Actor, AttemptRecord>,
    threshold: u32,
    block_duration: chrono::Duration,
    failure_window: chrono::Duration,
    max_entries: usize,
}

impl AbuseTracker {
    pub fn new(config: &AbuseConfig) -> Self {
        Self {
            records: DashMap::new(),
            threshold: config.threshold.max(1),
            block_duration: to_chrono(config.block_duration),
            failure_window: to_chrono(config.failure_window),
            max_entries: config.max_entries.max(1),
        }
    }

    /// Number of tracked actors.
    pub fn tracked(&self) -> usize {
        self.records.len()
    }

    /// Snapshot of an actor's record.
    pub fn record(&self, actor: &Actor) -> Option<AttemptRecord> {
        self.records.get(actor).map(|r| r.clone())
    }

    pub fn check(&self, actor: &Actor) -> Verdict {
        self.check_at(actor, Utc::now())
    }

    /// Whether the actor may proceed. Clears a block that has run out.
    pub fn check_at(&self, actor: &Actor, now: DateTime<Utc>) -> Verdict {
        let Some(mut record) = self.records.get_mut(actor) else {
            return Verdict::Allowed;
        };

        let blocked_until = record.blocked_until;
        match blocked_until {
            Some(until) if until > now => Verdict::Blocked { until },
            Some(_) => {
                record.blocked_until = None;
                let empty = record.failure_count == 0;
                drop(record);
                if empty {
                    self.records
                        .remove_if(actor, |_, r| r.blocked_until.is_none() && r.failure_count == 0);
                }
                debug!(actor = %actor, "Block expired");
                Verdict::Allowed
            }
            None => Verdict::Allowed,
        }
    }

    pub fn record_failure(&self, actor: &Actor) -> Verdict {
        self.record_failure_at(actor, Utc::now())
    }

    /// Count a failure. Returns `Blocked` if the actor is (now) blocked.
    ///
    /// Failures arriving while a block is active are not counted, so a block
    /// never extends itself.
    pub fn record_failure_at(&self, actor: &Actor, now: DateTime<Utc>) -> Verdict {
        if !self.records.contains_key(actor) {
            self.make_room(now);
        }

        let mut entry = self.records.entry(actor.clone()).or_default();
        let record = entry.value_mut();

        match record.blocked_until {
            Some(until) if until > now => return Verdict::Blocked { until },
            Some(_) => record.blocked_until = None,
            None => {}
        }

        if record
            .last_failure
            .is_some_and(|last| now - last > self.failure_window)
        {
            record.failure_count = 0;
        }

        record.failure_count = record.failure_count.saturating_add(1);
        record.last_failure = Some(now);

        if record.failure_count >= self.threshold {
            let until = now
                .checked_add_signed(self.block_duration)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            record.blocked_until = Some(until);
            record.failure_count = 0;
            warn!(actor = %actor, until = %until, "Actor blocked after repeated failures");
            return Verdict::Blocked { until };
        }

        debug!(actor = %actor, failures = record.failure_count, "Failure recorded");
        Verdict::Allowed
    }

    pub fn record_success(&self, actor: &Actor) {
        self.record_success_at(actor, Utc::now());
    }

    /// Forget an actor after a successful registration. A block set by
    /// concurrent failures while the request was in flight stays in place.
    pub fn record_success_at(&self, actor: &Actor, now: DateTime<Utc>) {
        self.records
            .remove_if(actor, |_, record| !record.is_blocked_at(now));
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// Drop expired records. Returns how many were removed.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, record| !record.is_expired_at(now, self.failure_window));
        before.saturating_sub(self.records.len())
    }

    /// Keep the map under `max_entries` before a new actor is inserted.
    ///
    /// Sweeps first; if that is not enough, evicts about one percent of the
    /// capacity, unblocked actors with the oldest failures first and blocked
    /// actors (soonest expiry first) only after those.
    fn make_room(&self, now: DateTime<Utc>) {
        if self.records.len() < self.max_entries {
            return;
        }

        let swept = self.sweep_at(now);
        if self.records.len() < self.max_entries {
            debug!(swept, "Swept expired records at capacity");
            return;
        }

        let mut candidates: Vec<((bool, DateTime<Utc>), Actor)> = self
            .records
            .iter()
            .map(|entry| {
                let record = entry.value();
                let key = if record.is_blocked_at(now) {
                    (true, record.blocked_until.unwrap_or(now))
                } else {
                    (false, record.last_failure.unwrap_or(now))
                };
                (key, entry.key().clone())
            })
            .collect();

        let evict = (self.max_entries / 100).max(1).min(candidates.len());
        if evict == 0 {
            return;
        }
        if evict < candidates.len() {
            candidates.select_nth_unstable_by(evict - 1, |a, b| a.0.cmp(&b.0));
        }
        for (_, actor) in candidates.into_iter().take(evict) {
            self.records.remove(&actor);
        }

        info!(evicted = evict, capacity = self.max_entries, "Abuse tracker at capacity, evicted records");
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}
