//! Core health checker implementation

use super::types::{CheckOutcome, CheckResult, CheckStatus, HealthReport, HealthStatus};
use crate::utils::error::Result;
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// An async health predicate
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> Result<CheckOutcome>;
}

struct FnCheck<F>(F);

#[async_trait]
impl<F, Fut> HealthCheck for FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<CheckOutcome>> + Send,
{
    async fn check(&self) -> Result<CheckOutcome> {
        (self.0)().await
    }
}

/// Wrap an async closure as a [`HealthCheck`]
pub fn check_fn<F, Fut>(f: F) -> Arc<dyn HealthCheck>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CheckOutcome>> + Send + 'static,
{
    Arc::new(FnCheck(f))
}

/// Runs named checks concurrently and folds them into one status
///
/// Every check runs on its own task under a timeout. An error, a panic or
/// an expired timeout counts as a failure of that check only.
pub struct HealthChecker {
    checks: RwLock<Vec<(String, Arc<dyn HealthCheck>)>>,
    timeout: Duration,
    version: String,
    started: Instant,
    last_report: RwLock<Option<HealthReport>>,
}

impl HealthChecker {
    pub fn new(version: impl Into<String>, timeout: Duration) -> Self {
        Self {
            checks: RwLock::new(Vec::new()),
            timeout,
            version: version.into(),
            started: Instant::now(),
            last_report: RwLock::new(None),
        }
    }

    /// Register `check` under `name`, replacing an existing check of that name
    pub fn register(&self, name: impl Into<String>, check: Arc<dyn HealthCheck>) {
        let name = name.into();
        let mut checks = self.checks.write();
        match checks.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = check,
            None => checks.push((name, check)),
        }
    }

    pub fn unregister(&self, name: &str) -> bool {
        let mut checks = self.checks.write();
        let before = checks.len();
        checks.retain(|(existing, _)| existing != name);
        checks.len() != before
    }

    pub fn check_names(&self) -> Vec<String> {
        self.checks.read().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Run every check and build a report
    pub async fn check_all(&self) -> HealthReport {
        let checks: Vec<(String, Arc<dyn HealthCheck>)> = self.checks.read().clone();
        debug!(checks = checks.len(), "Running health checks");

        let timeout = self.timeout;
        let runs = checks.into_iter().map(|(name, check)| async move {
            let start = Instant::now();
            let task = tokio::spawn(async move { tokio::time::timeout(timeout, check.check()).await });

            let outcome = match task.await {
                Ok(Ok(Ok(outcome))) => outcome,
                Ok(Ok(Err(e))) => CheckOutcome::fail(e.to_string()),
                Ok(Err(_)) => {
                    CheckOutcome::fail(format!("timed out after {}ms", timeout.as_millis()))
                }
                Err(join_error) => CheckOutcome::fail(panic_message(join_error)),
            };

            if outcome.status == CheckStatus::Fail {
                warn!(
                    check = %name,
                    reason = outcome.message.as_deref().unwrap_or(""),
                    "Health check failed"
                );
            }

            CheckResult {
                name,
                status: outcome.status,
                duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                message: outcome.message,
            }
        });

        let results = join_all(runs).await;
        let report = HealthReport {
            status: HealthStatus::fold(results.iter().map(|r| r.status)),
            timestamp: chrono::Utc::now(),
            version: self.version.clone(),
            uptime: self.started.elapsed().as_secs(),
            checks: results,
        };

        *self.last_report.write() = Some(report.clone());
        report
    }

    /// Report from the most recent run
    pub fn last_report(&self) -> Option<HealthReport> {
        self.last_report.read().clone()
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}

fn panic_message(error: tokio::task::JoinError) -> String {
    if !error.is_panic() {
        return "check cancelled".to_string();
    }
    let payload = error.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("panicked: {}", detail)
}
