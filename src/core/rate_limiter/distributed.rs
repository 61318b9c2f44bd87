//! Fixed window limiter over a shared key-value store

use super::limiter::SweepSchedule;
use super::store::{StoredWindow, WindowStore};
use super::types::{LimiterOptions, RateLimitResult, ceil_secs_ms, deadline_ms};
use crate::config::models::rate_limit::RateLimitConfig;
use crate::utils::error::{GuardError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Fixed window counting whose state lives in a [`WindowStore`]
///
/// Uses the store's atomic increment when it has one. Otherwise the window
/// is read, updated and written back, and concurrent requests may undercount.
/// A failing store admits the request.
///
/// Stores that cannot expire keys themselves are swept at most once per
/// maintenance interval from the request path.
pub struct DistributedLimiter {
    config: RateLimitConfig,
    store: Arc<dyn WindowStore>,
    key_prefix: String,
    sweep: SweepSchedule,
    lazy_sweep: bool,
}

impl DistributedLimiter {
    pub fn new(
        config: RateLimitConfig,
        store: Arc<dyn WindowStore>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self::with_options(config, store, key_prefix, LimiterOptions::default())
    }

    pub fn with_options(
        config: RateLimitConfig,
        store: Arc<dyn WindowStore>,
        key_prefix: impl Into<String>,
        options: LimiterOptions,
    ) -> Self {
        Self {
            config,
            store,
            key_prefix: key_prefix.into(),
            sweep: SweepSchedule::new(options.maintenance_interval),
            lazy_sweep: options.lazy_sweep,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn WindowStore> {
        &self.store
    }

    fn store_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Count a request made at `now_ms` (unix milliseconds)
    pub async fn check_and_record_at(&self, key: &str, now_ms: i64) -> RateLimitResult {
        if self.lazy_sweep && self.sweep.due(Instant::now()) {
            let removed = self.store.sweep().await;
            if removed > 0 {
                debug!(removed, store = self.store.name(), "Swept expired shared windows");
            }
        }

        let store_key = self.store_key(key);
        let window_ms = self.config.window_ms;

        let outcome = match self.store.increment(&store_key, window_ms, now_ms).await {
            Ok(Some(window)) => Ok(window),
            Ok(None) => self.read_modify_write(&store_key, now_ms).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(window) => self.decide(key, &window, now_ms),
            Err(e) => {
                warn!(
                    key = %key,
                    store = self.store.name(),
                    error = %e,
                    "Rate limit store unavailable, admitting request"
                );
                RateLimitResult {
                    allowed: true,
                    current_count: 0,
                    limit: self.config.max_requests,
                    remaining: self.config.max_requests,
                    reset_after_secs: ceil_secs_ms(deadline_ms(0, window_ms)),
                    retry_after_secs: None,
                }
            }
        }
    }

    /// Non-atomic path. Another process can write between the get and the put.
    async fn read_modify_write(&self, store_key: &str, now_ms: i64) -> Result<StoredWindow> {
        let next = match self.store.get(store_key).await? {
            Some(window) if now_ms < window.reset_at_ms => StoredWindow {
                count: window.count.saturating_add(1),
                reset_at_ms: window.reset_at_ms,
            },
            _ => StoredWindow {
                count: 1,
                reset_at_ms: deadline_ms(now_ms, self.config.window_ms),
            },
        };

        let ttl_ms = u64::try_from(next.reset_at_ms.saturating_sub(now_ms))
            .map_err(|_| GuardError::store("window already elapsed"))?;
        self.store
            .put(store_key, &next, Duration::from_millis(ttl_ms.max(1)))
            .await?;
        Ok(next)
    }

    fn decide(&self, key: &str, window: &StoredWindow, now_ms: i64) -> RateLimitResult {
        let limit = self.config.max_requests;
        let allowed = window.count <= limit;
        let reset_after_secs = ceil_secs_ms(window.reset_at_ms.saturating_sub(now_ms));

        if !allowed {
            debug!(
                key = %key,
                count = window.count,
                limit,
                "Rate limit exceeded in shared window"
            );
        }

        RateLimitResult {
            allowed,
            current_count: window.count,
            limit,
            remaining: limit.saturating_sub(window.count),
            reset_after_secs,
            retry_after_secs: (!allowed).then_some(reset_after_secs),
        }
    }

    /// Current state of `key` without counting a request
    pub async fn status_at(&self, key: &str, now_ms: i64) -> Result<RateLimitResult> {
        let limit = self.config.max_requests;
        let window = self
            .store
            .get(&self.store_key(key))
            .await?
            .filter(|w| now_ms < w.reset_at_ms);

        Ok(match window {
            Some(window) => {
                let reset_after_secs = ceil_secs_ms(window.reset_at_ms.saturating_sub(now_ms));
                let allowed = window.count < limit;
                RateLimitResult {
                    allowed,
                    current_count: window.count,
                    limit,
                    remaining: limit.saturating_sub(window.count),
                    reset_after_secs,
                    retry_after_secs: (!allowed).then_some(reset_after_secs),
                }
            }
            None => RateLimitResult {
                reset_after_secs: ceil_secs_ms(deadline_ms(0, self.config.window_ms)),
                ..RateLimitResult::unlimited(limit)
            },
        })
    }

    pub async fn reset(&self, key: &str) -> Result<()> {
        self.store.delete(&self.store_key(key)).await
    }
}
