//! Request admission guard
//!
//! Combines the blocklist with one limiter per named policy. The blocklist
//! is consulted first, so a blocked identity is denied even with quota left.

use super::blocklist::{IpBlocklist, ViolationTracker};
use super::rate_limiter::{
    DistributedLimiter, FixedWindowLimiter, LimiterOptions, MemoryWindowStore, RateLimitResult,
    RateLimiter, SlidingWindowLimiter, WindowStore, ceil_secs, cleanup_all, start_cleanup_task,
};
use crate::config::models::{
    AutoBlockConfig, BlocklistConfig, PolicyName, RateLimitSettings, RateLimitStrategy,
};
use crate::monitoring::metrics::MetricsCollector;
use crate::utils::error::Result;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Key shared by every request without an identity
pub const UNKNOWN_IDENTITY: &str = "unknown";

pub const HEADER_LIMIT: &str = "X-RateLimit-Limit";
pub const HEADER_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_RESET: &str = "X-RateLimit-Reset";
pub const HEADER_RETRY_AFTER: &str = "Retry-After";

/// Why a request was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    RateLimitExceeded,
    IpBlocked,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::RateLimitExceeded => "rate_limit_exceeded",
            RejectionReason::IpBlocked => "ip_blocked",
        }
    }

    /// HTTP status carried by the rejection
    pub fn status_code(&self) -> u16 {
        match self {
            RejectionReason::RateLimitExceeded => 429,
            RejectionReason::IpBlocked => 403,
        }
    }
}

/// JSON body of a rejected request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectionBody {
    pub error: &'static str,
    pub message: String,
    #[serde(rename = "retryAfter")]
    pub retry_after: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: RejectionReason,
    pub message: String,
    pub retry_after_secs: u64,
}

impl Rejection {
    pub fn body(&self) -> RejectionBody {
        RejectionBody {
            error: self.reason.as_str(),
            message: self.message.clone(),
            retry_after: self.retry_after_secs,
        }
    }
}

/// Outcome of evaluating one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionDecision {
    /// Identity the decision was keyed on
    pub identity: String,
    pub policy: PolicyName,
    /// Limiter state, absent when the limiter was not consulted
    pub limit: Option<RateLimitResult>,
    pub rejection: Option<Rejection>,
}

impl AdmissionDecision {
    pub fn is_allowed(&self) -> bool {
        self.rejection.is_none()
    }

    /// Response headers describing the decision
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::with_capacity(4);
        if let Some(limit) = &self.limit {
            headers.push((HEADER_LIMIT, limit.limit.to_string()));
            headers.push((HEADER_REMAINING, limit.remaining.to_string()));
            headers.push((HEADER_RESET, limit.reset_after_secs.to_string()));
        }
        if let Some(rejection) = &self.rejection {
            headers.push((HEADER_RETRY_AFTER, rejection.retry_after_secs.to_string()));
        }
        headers
    }
}

/// Admission guard over a blocklist and per-policy limiters
pub struct AdmissionGuard {
    enabled: bool,
    limiters: HashMap<PolicyName, Arc<dyn RateLimiter>>,
    blocklist: Arc<IpBlocklist>,
    block_message: String,
    auto_block: AutoBlockConfig,
    violations: Option<Arc<ViolationTracker>>,
    metrics: Option<Arc<MetricsCollector>>,
    store: Option<Arc<dyn WindowStore>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl AdmissionGuard {
    /// Build a guard with in-process limiters for every policy
    pub fn new(settings: &RateLimitSettings, blocklist: &BlocklistConfig) -> Self {
        let store: Arc<dyn WindowStore> = Arc::new(MemoryWindowStore::new());
        Self::with_store(settings, blocklist, store)
    }

    /// Build a guard whose distributed strategy uses `store`
    pub fn with_store(
        settings: &RateLimitSettings,
        blocklist: &BlocklistConfig,
        store: Arc<dyn WindowStore>,
    ) -> Self {
        let options = LimiterOptions {
            maintenance_interval: settings.maintenance_interval(),
            lazy_sweep: !settings.background_sweep,
            max_tracked_keys: settings.max_tracked_keys,
        };

        let limiters = settings
            .policies
            .iter()
            .map(|(name, policy)| {
                let limiter: Arc<dyn RateLimiter> = match settings.strategy {
                    RateLimitStrategy::FixedWindow => {
                        Arc::new(FixedWindowLimiter::with_options(policy.clone(), options))
                    }
                    RateLimitStrategy::SlidingWindow => {
                        Arc::new(SlidingWindowLimiter::with_options(policy.clone(), options))
                    }
                    RateLimitStrategy::Distributed => Arc::new(DistributedLimiter::with_options(
                        policy.clone(),
                        store.clone(),
                        format!("{}{}:", settings.store.key_prefix, name),
                        options,
                    )),
                };
                (name, limiter)
            })
            .collect();

        let violations = blocklist.auto_block.enabled.then(|| {
            Arc::new(ViolationTracker::with_sweep_interval(
                blocklist.auto_block.max_violations,
                blocklist.auto_block.violation_window(),
                settings.maintenance_interval(),
            ))
        });

        Self {
            enabled: settings.enabled,
            limiters,
            blocklist: Arc::new(IpBlocklist::new(settings.maintenance_interval())),
            block_message: blocklist.message.clone(),
            auto_block: blocklist.auto_block.clone(),
            violations,
            metrics: None,
            store: (settings.strategy == RateLimitStrategy::Distributed).then_some(store),
            sweeper: Mutex::new(None),
        }
    }

    /// Build a guard from configuration, connecting to Redis when the
    /// distributed strategy names a server
    pub async fn from_config(
        settings: &RateLimitSettings,
        blocklist: &BlocklistConfig,
    ) -> Result<Self> {
        let store = Self::connect_store(settings).await?;
        let guard = Self::with_store(settings, blocklist, store);
        if settings.background_sweep {
            guard.start_background_sweep(settings.maintenance_interval());
        }
        info!(
            strategy = ?settings.strategy,
            policies = guard.limiters.len(),
            enabled = settings.enabled,
            "Admission guard initialized"
        );
        Ok(guard)
    }

    #[cfg(feature = "redis")]
    async fn connect_store(settings: &RateLimitSettings) -> Result<Arc<dyn WindowStore>> {
        match (&settings.strategy, &settings.store.redis_url) {
            (RateLimitStrategy::Distributed, Some(url)) => Ok(Arc::new(
                super::rate_limiter::RedisWindowStore::connect(url).await?,
            )),
            _ => Ok(Arc::new(MemoryWindowStore::new())),
        }
    }

    #[cfg(not(feature = "redis"))]
    async fn connect_store(settings: &RateLimitSettings) -> Result<Arc<dyn WindowStore>> {
        if settings.store.redis_url.is_some() {
            warn!("Redis URL configured but the redis feature is disabled, using in-process store");
        }
        Ok(Arc::new(MemoryWindowStore::new()))
    }

    /// Report allowed, rate-limited and blocked counts into `metrics`
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Decide whether a request from `identity` under `policy` is admitted
    pub async fn evaluate(&self, identity: Option<&str>, policy: PolicyName) -> AdmissionDecision {
        let identity = identity
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(UNKNOWN_IDENTITY);
        let now = Instant::now();

        if let Some(remaining) = self.blocklist.remaining_at(identity, now) {
            debug!(identity = %identity, "Request from blocked identity");
            self.count("guard.ip_blocked");
            return AdmissionDecision {
                identity: identity.to_string(),
                policy,
                limit: None,
                rejection: Some(Rejection {
                    reason: RejectionReason::IpBlocked,
                    message: self.block_message.clone(),
                    retry_after_secs: ceil_secs(remaining).max(1),
                }),
            };
        }

        let limiter = match self.limiters.get(&policy) {
            Some(limiter) if self.enabled => limiter,
            _ => {
                self.count("guard.allowed");
                return AdmissionDecision {
                    identity: identity.to_string(),
                    policy,
                    limit: None,
                    rejection: None,
                };
            }
        };

        let result = limiter.check_and_record(identity).await;
        if result.allowed {
            self.count("guard.allowed");
            return AdmissionDecision {
                identity: identity.to_string(),
                policy,
                limit: Some(result),
                rejection: None,
            };
        }

        self.count("guard.rate_limited");
        self.escalate(identity, now);

        let retry_after_secs = result.retry_after_secs.unwrap_or(result.reset_after_secs);
        AdmissionDecision {
            identity: identity.to_string(),
            policy,
            rejection: Some(Rejection {
                reason: RejectionReason::RateLimitExceeded,
                message: limiter.config().message.clone(),
                retry_after_secs,
            }),
            limit: Some(result),
        }
    }

    fn escalate(&self, identity: &str, now: Instant) {
        let Some(violations) = &self.violations else {
            return;
        };
        if violations.record_at(identity, now) {
            warn!(
                identity = %identity,
                max_violations = self.auto_block.max_violations,
                block_secs = ceil_secs(self.auto_block.block_duration()),
                "Repeated rate limit violations, blocking identity"
            );
            self.blocklist
                .block_at(identity, self.auto_block.block_duration(), now);
        }
    }

    fn count(&self, name: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.increment(name, 1);
        }
    }

    /// Limiter state for `identity` under `policy` without counting a request
    pub async fn status(&self, identity: &str, policy: PolicyName) -> Option<RateLimitResult> {
        let limiter = self.limiters.get(&policy)?;
        Some(limiter.status(identity).await)
    }

    /// Clear the counters of `identity` under every policy
    pub async fn reset(&self, identity: &str) {
        for limiter in self.limiters.values() {
            limiter.reset(identity).await;
        }
        if let Some(violations) = &self.violations {
            violations.forget(identity);
        }
    }

    pub fn block(&self, identity: &str, duration: Duration) {
        self.blocklist.block(identity, duration);
    }

    pub fn unblock(&self, identity: &str) -> bool {
        self.blocklist.unblock(identity)
    }

    pub fn blocklist(&self) -> &Arc<IpBlocklist> {
        &self.blocklist
    }

    pub fn limiter(&self, policy: PolicyName) -> Option<&Arc<dyn RateLimiter>> {
        self.limiters.get(&policy)
    }

    /// Shared window store, present under the distributed strategy
    pub fn shared_store(&self) -> Option<&Arc<dyn WindowStore>> {
        self.store.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of identities with recent rate limit violations
    pub fn tracked_violations(&self) -> usize {
        self.violations.as_ref().map_or(0, |v| v.len())
    }

    fn sweep_targets(&self) -> SweepTargets {
        SweepTargets {
            limiters: self.limiters.values().cloned().collect(),
            blocklist: self.blocklist.clone(),
            violations: self.violations.clone(),
        }
    }

    /// Sweep every limiter, the blocklist and the violation counts now
    pub async fn cleanup(&self) -> usize {
        self.sweep_targets().sweep().await
    }

    /// Replace lazy limiter sweeping with a tokio interval task that also
    /// sweeps the blocklist and the violation counts
    pub fn start_background_sweep(&self, every: Duration) {
        let targets = self.sweep_targets();
        let handle = start_cleanup_task(every, move || {
            let targets = targets.clone();
            async move { targets.sweep().await }
        });
        if let Some(previous) = self.sweeper.lock().replace(handle) {
            previous.abort();
        }
        debug!(interval_ms = every.as_millis() as u64, "Background sweep started");
    }

    /// Stop the background sweep, if one is running
    pub fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
    }
}

/// State swept on each maintenance tick
#[derive(Clone)]
struct SweepTargets {
    limiters: Vec<Arc<dyn RateLimiter>>,
    blocklist: Arc<IpBlocklist>,
    violations: Option<Arc<ViolationTracker>>,
}

impl SweepTargets {
    async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut removed = self.blocklist.sweep_at(now);
        removed += cleanup_all(&self.limiters).await;
        if let Some(violations) = &self.violations {
            removed += violations.cleanup_at(now);
        }
        removed
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        self.shutdown();
    }
}
