//! Rate Limiting Implementation
//!
//! Fixed window, sliding window log and store backed fixed window limiters
//! behind one async [`RateLimiter`] trait.

mod distributed;
mod limiter;
mod store;
mod strategies;
mod types;
mod utils;


pub use distributed::DistributedLimiter;
#[cfg(feature = "redis")]
pub use store::RedisWindowStore;
pub use store::{MemoryWindowStore, StoredWindow, WindowStore};
pub use strategies::{FixedWindowLimiter, SlidingWindowLimiter};
pub use types::{LimiterOptions, MAX_DURATION, RateLimitResult};
pub use utils::{cleanup_all, start_cleanup_task};

pub(crate) use limiter::SweepSchedule;
pub(crate) use types::{ceil_secs, deadline};

use crate::config::models::rate_limit::{RateLimitConfig, RateLimitStrategy};
use async_trait::async_trait;
use std::time::Instant;
use tracing::warn;

/// Admission decision for one identity under one policy
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count a request and decide whether it is admitted
    async fn check_and_record(&self, key: &str) -> RateLimitResult;

    /// Inspect the state of `key` without counting a request
    async fn status(&self, key: &str) -> RateLimitResult;

    /// Forget everything recorded for `key`
    async fn reset(&self, key: &str);

    /// Remove expired state, returning how many entries were removed
    async fn cleanup(&self) -> usize;

    fn config(&self) -> &RateLimitConfig;

    fn strategy(&self) -> RateLimitStrategy;

    /// Get the configured limit
    fn limit(&self) -> u32 {
        self.config().max_requests
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn check_and_record(&self, key: &str) -> RateLimitResult {
        self.check_and_record_at(key, Instant::now())
    }

    async fn status(&self, key: &str) -> RateLimitResult {
        self.status_at(key, Instant::now())
    }

    async fn reset(&self, key: &str) {
        FixedWindowLimiter::reset(self, key);
    }

    async fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    fn config(&self) -> &RateLimitConfig {
        FixedWindowLimiter::config(self)
    }

    fn strategy(&self) -> RateLimitStrategy {
        RateLimitStrategy::FixedWindow
    }
}

#[async_trait]
impl RateLimiter for SlidingWindowLimiter {
    async fn check_and_record(&self, key: &str) -> RateLimitResult {
        self.check_and_record_at(key, Instant::now())
    }

    async fn status(&self, key: &str) -> RateLimitResult {
        self.status_at(key, Instant::now())
    }

    async fn reset(&self, key: &str) {
        SlidingWindowLimiter::reset(self, key);
    }

    async fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    fn config(&self) -> &RateLimitConfig {
        SlidingWindowLimiter::config(self)
    }

    fn strategy(&self) -> RateLimitStrategy {
        RateLimitStrategy::SlidingWindow
    }
}

#[async_trait]
impl RateLimiter for DistributedLimiter {
    async fn check_and_record(&self, key: &str) -> RateLimitResult {
        self.check_and_record_at(key, chrono::Utc::now().timestamp_millis())
            .await
    }

    async fn status(&self, key: &str) -> RateLimitResult {
        match self
            .status_at(key, chrono::Utc::now().timestamp_millis())
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read rate limit status from store");
                RateLimitResult::unlimited(self.config().max_requests)
            }
        }
    }

    async fn reset(&self, key: &str) {
        if let Err(e) = DistributedLimiter::reset(self, key).await {
            warn!(key = %key, error = %e, "Failed to reset rate limit key in store");
        }
    }

    async fn cleanup(&self) -> usize {
        self.store().sweep().await
    }

    fn config(&self) -> &RateLimitConfig {
        DistributedLimiter::config(self)
    }

    fn strategy(&self) -> RateLimitStrategy {
        RateLimitStrategy::Distributed
    }
}
