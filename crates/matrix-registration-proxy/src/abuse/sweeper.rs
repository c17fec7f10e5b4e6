//! Periodic removal of expired abuse records.

use super::AbuseTracker;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Spawn a task that sweeps `tracker` every `interval`.
pub fn spawn_sweeper(tracker: Arc<AbuseTracker>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = tracker.sweep();
            debug!(removed, remaining = tracker.tracked(), "Abuse sweep complete");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abuse::Actor;
    use crate::config::AbuseConfig;

    #[tokio::test]
    async fn test_sweeper_removes_expired_records() {
        let tracker = Arc::new(AbuseTracker::new(&AbuseConfig {
            failure_window: Duration::from_millis(10),
            ..AbuseConfig::default()
        }));
        tracker.record_failure(&Actor::new([10, 0, 0, 1].into()));
        assert_eq!(tracker.tracked(), 1);

        let handle = spawn_sweeper(tracker.clone(), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(tracker.tracked(), 0);
    }
}
