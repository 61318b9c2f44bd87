//! Built-in health checks

use super::checker::HealthCheck;
use super::types::CheckOutcome;
use crate::core::rate_limiter::WindowStore;
use crate::monitoring::errors::ErrorTracker;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Warns when too many errors were captured recently
pub struct ErrorRateCheck {
    tracker: Arc<ErrorTracker>,
    window: Duration,
    warn_threshold: usize,
}

impl ErrorRateCheck {
    pub fn new(tracker: Arc<ErrorTracker>, window: Duration, warn_threshold: usize) -> Self {
        Self {
            tracker,
            window,
            warn_threshold,
        }
    }
}

#[async_trait]
impl HealthCheck for ErrorRateCheck {
    async fn check(&self) -> Result<CheckOutcome> {
        let since = chrono::Duration::from_std(self.window)
            .ok()
            .and_then(|window| chrono::Utc::now().checked_sub_signed(window))
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);
        let count = self.tracker.error_count_since(since);
        let message = format!("{} errors in the last {}s", count, self.window.as_secs());

        Ok(if count >= self.warn_threshold {
            CheckOutcome::warn(message)
        } else {
            CheckOutcome::pass().with_message(message)
        })
    }
}

/// Fails when the shared window store does not answer a ping
pub struct StoreCheck {
    store: Arc<dyn WindowStore>,
}

impl StoreCheck {
    pub fn new(store: Arc<dyn WindowStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HealthCheck for StoreCheck {
    async fn check(&self) -> Result<CheckOutcome> {
        self.store.ping().await?;
        Ok(CheckOutcome::pass().with_message(format!("{} store reachable", self.store.name())))
    }
}
