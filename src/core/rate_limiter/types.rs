//! Rate limiter types and data structures

use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rate limit result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Current request count in the window
    pub current_count: u32,
    /// Maximum requests allowed
    pub limit: u32,
    /// Remaining requests in the window
    pub remaining: u32,
    /// Time until the window resets (in seconds)
    pub reset_after_secs: u64,
    /// Retry after (in seconds, only set when not allowed)
    pub retry_after_secs: Option<u64>,
}

impl RateLimitResult {
    /// Result reported when limiting is switched off
    pub fn unlimited(limit: u32) -> Self {
        Self {
            allowed: true,
            current_count: 0,
            limit,
            remaining: limit,
            reset_after_secs: 0,
            retry_after_secs: None,
        }
    }
}

/// Tuning shared by the in-process limiters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterOptions {
    /// Expired state is removed within one interval of expiring
    pub maintenance_interval: Duration,
    /// Sweep at the start of a check once per interval
    pub lazy_sweep: bool,
    /// Least recently used identities are evicted above this many
    pub max_tracked_keys: Option<usize>,
}

impl Default for LimiterOptions {
    fn default() -> Self {
        Self {
            maintenance_interval: Duration::from_secs(60),
            lazy_sweep: true,
            max_tracked_keys: None,
        }
    }
}

/// Fixed window counter for one identity
#[derive(Debug, Clone, Copy)]
pub(super) struct FixedWindowEntry {
    pub(super) count: u32,
    /// Exclusive end of the window
    pub(super) reset_at: Instant,
}

impl FixedWindowEntry {
    pub(super) fn start(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: deadline(now, window),
        }
    }

    #[inline]
    pub(super) fn is_expired(&self, now: Instant) -> bool {
        now >= self.reset_at
    }
}

/// Request instants of one identity, oldest first
pub(super) type SlidingWindowLog = VecDeque<Instant>;

/// Longest window or block duration the guard accepts (ten years)
pub const MAX_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// `now + duration`, clamped to [`MAX_DURATION`] so it cannot overflow `Instant`
#[inline]
pub(crate) fn deadline(now: Instant, duration: Duration) -> Instant {
    now.checked_add(duration.min(MAX_DURATION)).unwrap_or(now)
}

/// `now_ms + duration` in unix milliseconds, saturating at `i64::MAX`
#[inline]
pub(crate) fn deadline_ms(now_ms: i64, duration_ms: u64) -> i64 {
    now_ms.saturating_add(i64::try_from(duration_ms).unwrap_or(i64::MAX))
}

/// Round a duration up to whole seconds at millisecond resolution
#[inline]
pub(crate) fn ceil_secs(duration: Duration) -> u64 {
    (duration.as_millis() as u64).div_ceil(1000)
}

/// Same rounding for a millisecond count
#[inline]
pub(crate) fn ceil_secs_ms(millis: i64) -> u64 {
    (millis.max(0) as u64).div_ceil(1000)
}
