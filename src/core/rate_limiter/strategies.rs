//! In-process rate limiting strategies

use super::limiter::{KeyedEntries, entry_or_insert};
use super::types::{
    FixedWindowEntry, LimiterOptions, RateLimitResult, SlidingWindowLog, ceil_secs, deadline,
};
use crate::config::models::rate_limit::RateLimitConfig;
use std::time::{Duration, Instant};
use tracing::debug;

/// Fixed window counter per identity
///
/// The first request of a window creates the entry with `count = 1`; every
/// later request in the window increments it, and the request that pushes
/// `count` past `max_requests` is the first one rejected. A request at or
/// after `reset_at` replaces the entry instead of incrementing it.
pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    window: Duration,
    entries: KeyedEntries<FixedWindowEntry>,
}

impl FixedWindowLimiter {
    /// Create a limiter with default maintenance options
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_options(config, LimiterOptions::default())
    }

    pub fn with_options(config: RateLimitConfig, options: LimiterOptions) -> Self {
        Self {
            window: config.window(),
            entries: KeyedEntries::new(&options),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count a request made at `now` and decide whether it is admitted
    pub fn check_and_record_at(&self, key: &str, now: Instant) -> RateLimitResult {
        let limit = self.config.max_requests;
        let window = self.window;

        let (count, reset_at) = {
            let mut entries = self.entries.lock_at(now, |entry| !entry.is_expired(now));
            let entry = entry_or_insert(&mut entries, key, || FixedWindowEntry {
                count: 0,
                reset_at: deadline(now, window),
            });
            if entry.is_expired(now) {
                *entry = FixedWindowEntry::start(now, window);
            } else {
                entry.count = entry.count.saturating_add(1);
            }
            (entry.count, entry.reset_at)
        };

        let allowed = count <= limit;
        let reset_after_secs = ceil_secs(reset_at.saturating_duration_since(now));

        if !allowed {
            debug!(
                key = %key,
                count,
                limit,
                "Rate limit exceeded in fixed window"
            );
        }

        RateLimitResult {
            allowed,
            current_count: count,
            limit,
            remaining: limit.saturating_sub(count),
            reset_after_secs,
            retry_after_secs: (!allowed).then_some(reset_after_secs),
        }
    }

    /// Current state of `key` without counting a request
    pub fn status_at(&self, key: &str, now: Instant) -> RateLimitResult {
        let limit = self.config.max_requests;
        let entries = self.entries.lock();
        match entries.peek(key).filter(|entry| !entry.is_expired(now)) {
            Some(entry) => {
                let reset_after_secs = ceil_secs(entry.reset_at.saturating_duration_since(now));
                let allowed = entry.count < limit;
                RateLimitResult {
                    allowed,
                    current_count: entry.count,
                    limit,
                    remaining: limit.saturating_sub(entry.count),
                    reset_after_secs,
                    retry_after_secs: (!allowed).then_some(reset_after_secs),
                }
            }
            None => RateLimitResult {
                allowed: true,
                current_count: 0,
                limit,
                remaining: limit,
                reset_after_secs: ceil_secs(self.window),
                retry_after_secs: None,
            },
        }
    }

    /// Drop the window of `key`
    pub fn reset(&self, key: &str) {
        self.entries.lock().pop(key);
    }

    /// Remove every expired window, returning how many were removed
    pub fn cleanup_at(&self, now: Instant) -> usize {
        self.entries.retain(|entry| !entry.is_expired(now))
    }

    /// Number of tracked identities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sliding window log per identity
///
/// Keeps the instants of admitted requests inside `[now - window, now]`.
/// A request is rejected once that log holds `max_requests` instants, so no
/// window of the configured length ever admits more than the limit.
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    window: Duration,
    entries: KeyedEntries<SlidingWindowLog>,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_options(config, LimiterOptions::default())
    }

    pub fn with_options(config: RateLimitConfig, options: LimiterOptions) -> Self {
        Self {
            window: config.window(),
            entries: KeyedEntries::new(&options),
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Decide on a request made at `now`, recording it when admitted
    pub fn check_and_record_at(&self, key: &str, now: Instant) -> RateLimitResult {
        let limit = self.config.max_requests;
        let window = self.window;
        let cutoff = now.checked_sub(window);

        let mut logs = self.entries.lock_at(now, |log| {
            prune(log, cutoff);
            !log.is_empty()
        });
        let log = entry_or_insert(&mut logs, key, SlidingWindowLog::new);
        prune(log, cutoff);

        if log.len() >= limit as usize {
            let oldest = log.front().copied().unwrap_or(now);
            let retry_after =
                ceil_secs(deadline(oldest, window).saturating_duration_since(now)).max(1);
            let current_count = log.len() as u32;
            drop(logs);

            debug!(
                key = %key,
                count = current_count,
                limit,
                "Rate limit exceeded in sliding window"
            );

            return RateLimitResult {
                allowed: false,
                current_count,
                limit,
                remaining: 0,
                reset_after_secs: retry_after,
                retry_after_secs: Some(retry_after),
            };
        }

        log.push_back(now);
        let current_count = log.len() as u32;
        let oldest = log.front().copied().unwrap_or(now);

        RateLimitResult {
            allowed: true,
            current_count,
            limit,
            remaining: limit.saturating_sub(current_count),
            reset_after_secs: ceil_secs(deadline(oldest, window).saturating_duration_since(now)),
            retry_after_secs: None,
        }
    }

    /// Current state of `key` without recording a request
    pub fn status_at(&self, key: &str, now: Instant) -> RateLimitResult {
        let limit = self.config.max_requests;
        let cutoff = now.checked_sub(self.window);
        let logs = self.entries.lock();

        let live: Vec<Instant> = logs
            .peek(key)
            .map(|log| {
                log.iter()
                    .copied()
                    .filter(|t| cutoff.is_none_or(|c| *t >= c))
                    .collect()
            })
            .unwrap_or_default();

        let current_count = live.len() as u32;
        let allowed = current_count < limit;
        let reset_after_secs = live
            .first()
            .map(|oldest| {
                ceil_secs(deadline(*oldest, self.window).saturating_duration_since(now))
            })
            .unwrap_or_else(|| ceil_secs(self.window));

        RateLimitResult {
            allowed,
            current_count,
            limit,
            remaining: limit.saturating_sub(current_count),
            reset_after_secs,
            retry_after_secs: (!allowed).then_some(reset_after_secs.max(1)),
        }
    }

    pub fn reset(&self, key: &str) {
        self.entries.lock().pop(key);
    }

    /// Prune every log and drop the empty ones
    pub fn cleanup_at(&self, now: Instant) -> usize {
        let cutoff = now.checked_sub(self.window);
        self.entries.retain(|log| {
            prune(log, cutoff);
            !log.is_empty()
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drop instants older than `cutoff`. No cutoff means the window reaches
/// back before the clock origin and everything is kept.
fn prune(log: &mut SlidingWindowLog, cutoff: Option<Instant>) {
    let Some(cutoff) = cutoff else { return };
    while log.front().is_some_and(|t| *t < cutoff) {
        log.pop_front();
    }
}
