//! Time-bounded identity blocklist with automatic escalation

use super::rate_limiter::{MAX_DURATION, SweepSchedule, ceil_secs, deadline};
use dashmap::DashMap;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Identities denied admission until an absolute unblock instant
pub struct IpBlocklist {
    blocked: DashMap<String, Instant>,
    sweep: SweepSchedule,
}

/// A live block as reported to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedEntry {
    pub identity: String,
    pub remaining_secs: u64,
}

impl Default for IpBlocklist {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl IpBlocklist {
    /// Create a blocklist sweeping expired blocks at most once per `maintenance_interval`
    pub fn new(maintenance_interval: Duration) -> Self {
        Self {
            blocked: DashMap::new(),
            sweep: SweepSchedule::new(maintenance_interval),
        }
    }

    pub fn is_blocked(&self, identity: &str) -> bool {
        self.is_blocked_at(identity, Instant::now())
    }

    pub fn is_blocked_at(&self, identity: &str, now: Instant) -> bool {
        self.remaining_at(identity, now).is_some()
    }

    /// Time left on the block of `identity`, if it is blocked at `now`
    pub fn remaining_at(&self, identity: &str, now: Instant) -> Option<Duration> {
        if self.sweep.due(now) {
            self.sweep_at(now);
        }

        let unblock_at = self.blocked.get(identity).map(|entry| *entry.value())?;
        if unblock_at > now {
            return Some(unblock_at - now);
        }

        self.blocked
            .remove_if(identity, |_, unblock_at| *unblock_at <= now);
        None
    }

    /// Block `identity` for `duration`, replacing any existing block
    pub fn block(&self, identity: &str, duration: Duration) {
        self.block_at(identity, duration, Instant::now());
    }

    /// Block `identity` from `now`. Durations above [`MAX_DURATION`] are clamped.
    pub fn block_at(&self, identity: &str, duration: Duration, now: Instant) {
        self.blocked
            .insert(identity.to_string(), deadline(now, duration));
        info!(
            identity = %identity,
            duration_secs = ceil_secs(duration.min(MAX_DURATION)),
            "Identity blocked"
        );
    }

    /// Lift the block on `identity`. Returns whether a block was present.
    pub fn unblock(&self, identity: &str) -> bool {
        let removed = self.blocked.remove(identity).is_some();
        if removed {
            info!(identity = %identity, "Identity unblocked");
        }
        removed
    }

    /// Remove expired blocks, returning how many were removed
    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.blocked.len();
        self.blocked.retain(|_, unblock_at| *unblock_at > now);
        let removed = before.saturating_sub(self.blocked.len());
        if removed > 0 {
            debug!(removed, "Swept expired blocks");
        }
        removed
    }

    /// Live blocks, soonest to expire first
    pub fn list_at(&self, now: Instant) -> Vec<BlockedEntry> {
        let mut live: Vec<(Instant, String)> = self
            .blocked
            .iter()
            .filter(|entry| *entry.value() > now)
            .map(|entry| (*entry.value(), entry.key().clone()))
            .collect();
        live.sort();
        live.into_iter()
            .map(|(unblock_at, identity)| BlockedEntry {
                identity,
                remaining_secs: ceil_secs(unblock_at - now),
            })
            .collect()
    }

    pub fn list(&self) -> Vec<BlockedEntry> {
        self.list_at(Instant::now())
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}

/// Counts rate-limit rejections per identity inside a rolling window
///
/// Identities whose window has lapsed are swept at most once per sweep
/// interval while recording, so the map tracks only recent offenders.
pub struct ViolationTracker {
    violations: DashMap<String, ViolationWindow>,
    max_violations: u32,
    window: Duration,
    sweep: SweepSchedule,
}

struct ViolationWindow {
    count: u32,
    window_start: Instant,
}

impl ViolationTracker {
    /// Create a tracker that sweeps lapsed windows once per `window`
    pub fn new(max_violations: u32, window: Duration) -> Self {
        Self::with_sweep_interval(max_violations, window, window)
    }

    pub fn with_sweep_interval(max_violations: u32, window: Duration, every: Duration) -> Self {
        Self {
            violations: DashMap::new(),
            max_violations,
            window,
            sweep: SweepSchedule::new(every),
        }
    }

    /// Record one rejection. Returns true when it reaches the threshold,
    /// at which point the identity's count starts over.
    pub fn record_at(&self, identity: &str, now: Instant) -> bool {
        if self.sweep.due(now) {
            let removed = self.cleanup_at(now);
            if removed > 0 {
                debug!(removed, "Swept lapsed violation windows");
            }
        }

        let mut entry = self
            .violations
            .entry(identity.to_string())
            .or_insert_with(|| ViolationWindow {
                count: 0,
                window_start: now,
            });

        let tracker = entry.value_mut();
        if now.saturating_duration_since(tracker.window_start) >= self.window {
            tracker.count = 0;
            tracker.window_start = now;
        }
        tracker.count += 1;

        if tracker.count >= self.max_violations {
            tracker.count = 0;
            tracker.window_start = now;
            return true;
        }
        false
    }

    pub fn forget(&self, identity: &str) {
        self.violations.remove(identity);
    }

    pub fn cleanup_at(&self, now: Instant) -> usize {
        let before = self.violations.len();
        self.violations
            .retain(|_, tracker| now.saturating_duration_since(tracker.window_start) < self.window);
        before.saturating_sub(self.violations.len())
    }

    /// Number of identities with a live violation window
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_and_expiry() {
        let blocklist = IpBlocklist::default();
        let t0 = Instant::now();

        assert!(!blocklist.is_blocked_at("10.0.0.1", t0));
        blocklist.block_at("10.0.0.1", Duration::from_secs(30), t0);

        assert!(blocklist.is_blocked_at("10.0.0.1", t0 + Duration::from_secs(29)));
        assert_eq!(
            blocklist.remaining_at("10.0.0.1", t0 + Duration::from_secs(10)),
            Some(Duration::from_secs(20))
        );
        assert!(!blocklist.is_blocked_at("10.0.0.1", t0 + Duration::from_secs(30)));
        // Expired block was removed on read
        assert!(blocklist.is_empty());
    }

    #[test]
    fn test_unblock() {
        let blocklist = IpBlocklist::default();
        blocklist.block("10.0.0.2", Duration::from_secs(3600));
        assert!(blocklist.is_blocked("10.0.0.2"));

        assert!(blocklist.unblock("10.0.0.2"));
        assert!(!blocklist.is_blocked("10.0.0.2"));
        assert!(!blocklist.unblock("10.0.0.2"));
    }

    #[test]
    fn test_reblock_replaces_expiry() {
        let blocklist = IpBlocklist::default();
        let t0 = Instant::now();
        blocklist.block_at("a", Duration::from_secs(100), t0);
        blocklist.block_at("a", Duration::from_secs(5), t0);
        assert!(!blocklist.is_blocked_at("a", t0 + Duration::from_secs(6)));
    }

    #[test]
    fn test_opportunistic_sweep() {
        let blocklist = IpBlocklist::new(Duration::from_secs(60));
        let t0 = Instant::now();
        for i in 0..5 {
            blocklist.block_at(&format!("ip-{}", i), Duration::from_secs(10), t0);
        }
        blocklist.block_at("long", Duration::from_secs(600), t0);

        blocklist.is_blocked_at("other", t0 + Duration::from_secs(20));
        assert_eq!(blocklist.len(), 6);

        blocklist.is_blocked_at("other", t0 + Duration::from_secs(61));
        assert_eq!(blocklist.len(), 1);
    }

    #[test]
    fn test_list_orders_by_expiry() {
        let blocklist = IpBlocklist::default();
        let t0 = Instant::now();
        blocklist.block_at("late", Duration::from_secs(300), t0);
        blocklist.block_at("soon", Duration::from_secs(30), t0);
        blocklist.block_at("gone", Duration::from_secs(1), t0);

        let listed = blocklist.list_at(t0 + Duration::from_secs(2));
        assert_eq!(
            listed,
            vec![
                BlockedEntry {
                    identity: "soon".to_string(),
                    remaining_secs: 28
                },
                BlockedEntry {
                    identity: "late".to_string(),
                    remaining_secs: 298
                },
            ]
        );
    }

    #[test]
    fn test_violation_threshold() {
        let tracker = ViolationTracker::new(3, Duration::from_secs(60));
        let t0 = Instant::now();

        assert!(!tracker.record_at("a", t0));
        assert!(!tracker.record_at("a", t0 + Duration::from_secs(1)));
        assert!(tracker.record_at("a", t0 + Duration::from_secs(2)));
        // Count starts over after escalation
        assert!(!tracker.record_at("a", t0 + Duration::from_secs(3)));
    }

    #[test]
    fn test_violation_window_expires() {
        let tracker = ViolationTracker::new(2, Duration::from_secs(10));
        let t0 = Instant::now();

        assert!(!tracker.record_at("a", t0));
        assert!(!tracker.record_at("a", t0 + Duration::from_secs(11)));
        assert!(tracker.record_at("a", t0 + Duration::from_secs(12)));

        assert_eq!(tracker.cleanup_at(t0 + Duration::from_secs(30)), 1);
    }

    #[test]
    fn test_violation_map_is_swept_while_recording() {
        let tracker = ViolationTracker::with_sweep_interval(
            5,
            Duration::from_secs(10),
            Duration::from_secs(1),
        );
        let t0 = Instant::now();
        for i in 0..1_000 {
            tracker.record_at(&format!("10.0.{}.{}", i / 256, i % 256), t0);
        }
        assert_eq!(tracker.len(), 1_000);

        // Still inside the window, nothing lapsed
        tracker.record_at("10.9.9.9", t0 + Duration::from_secs(5));
        assert_eq!(tracker.len(), 1_001);

        tracker.record_at("10.9.9.9", t0 + Duration::from_secs(16));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_huge_block_duration_is_clamped() {
        let blocklist = IpBlocklist::default();
        let t0 = Instant::now();
        blocklist.block_at("forever", Duration::from_secs(u64::MAX), t0);
        blocklist.block("also", Duration::MAX);

        assert_eq!(blocklist.remaining_at("forever", t0), Some(MAX_DURATION));
        assert!(blocklist.is_blocked("also"));
        assert_eq!(blocklist.list().len(), 2);
    }
}
