//! Core ObservabilityContext implementation

use super::errors::ErrorTracker;
use super::health::{ErrorRateCheck, HealthChecker};
use super::logger::StructuredLogger;
use super::metrics::MetricsCollector;
use crate::config::ObservabilityConfig;
use crate::utils::error::{GuardError, Result};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::info;

/// Initialized observability components
pub struct Observability {
    pub logger: StructuredLogger,
    pub metrics: Arc<MetricsCollector>,
    pub errors: Arc<ErrorTracker>,
    pub health: Arc<HealthChecker>,
}

/// Explicitly initialized holder for the logger, metrics collector, error
/// tracker and health checker
///
/// Accessors fail with [`GuardError::NotInitialized`] until [`init`] has run.
///
/// [`init`]: ObservabilityContext::init
pub struct ObservabilityContext {
    config: ObservabilityConfig,
    inner: OnceLock<Observability>,
}

impl ObservabilityContext {
    pub fn new(config: ObservabilityConfig) -> Self {
        Self {
            config,
            inner: OnceLock::new(),
        }
    }

    /// Build every component. Must run inside a tokio runtime when error
    /// forwarding is configured.
    pub fn init(&self) -> Result<()> {
        if self.inner.get().is_some() {
            return Err(GuardError::AlreadyInitialized);
        }

        let config = &self.config;
        let errors = Arc::new(ErrorTracker::from_config(&config.errors)?);
        let health = Arc::new(HealthChecker::new(
            config.health.version(),
            config.health.check_timeout(),
        ));
        health.register(
            "error_rate",
            Arc::new(ErrorRateCheck::new(
                errors.clone(),
                Duration::from_secs(config.health.error_rate_window_secs),
                config.health.error_rate_warn_threshold,
            )),
        );

        let components = Observability {
            logger: StructuredLogger::from_config(&config.logger),
            metrics: Arc::new(MetricsCollector::from_config(&config.metrics)),
            errors,
            health,
        };

        self.inner
            .set(components)
            .map_err(|_| GuardError::AlreadyInitialized)?;

        info!(
            min_level = %config.logger.min_level,
            log_capacity = config.logger.buffer_capacity,
            forwarding = config.errors.endpoint.is_some(),
            "Observability initialized"
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.get().is_some()
    }

    pub fn components(&self) -> Result<&Observability> {
        self.inner.get().ok_or(GuardError::NotInitialized("observability"))
    }

    pub fn logger(&self) -> Result<&StructuredLogger> {
        self.inner
            .get()
            .map(|c| &c.logger)
            .ok_or(GuardError::NotInitialized("logger"))
    }

    pub fn metrics(&self) -> Result<&Arc<MetricsCollector>> {
        self.inner
            .get()
            .map(|c| &c.metrics)
            .ok_or(GuardError::NotInitialized("metrics collector"))
    }

    pub fn errors(&self) -> Result<&Arc<ErrorTracker>> {
        self.inner
            .get()
            .map(|c| &c.errors)
            .ok_or(GuardError::NotInitialized("error tracker"))
    }

    pub fn health(&self) -> Result<&Arc<HealthChecker>> {
        self.inner
            .get()
            .map(|c| &c.health)
            .ok_or(GuardError::NotInitialized("health checker"))
    }

    pub fn config(&self) -> &ObservabilityConfig {
        &self.config
    }

    /// Flush pending error forwards
    pub async fn shutdown(&self) -> Result<()> {
        let components = self.components()?;
        info!("Shutting down observability");
        components.errors.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::logger::LogLevel;

    #[test]
    fn test_access_before_init_fails() {
        let context = ObservabilityContext::new(ObservabilityConfig::default());
        assert!(!context.is_initialized());

        let err = context.logger().unwrap_err();
        assert!(matches!(err, GuardError::NotInitialized("logger")));
        assert_eq!(err.to_string(), "logger accessed before initialization");
        assert!(context.metrics().is_err());
        assert!(context.errors().is_err());
        assert!(context.health().is_err());
    }

    #[tokio::test]
    async fn test_init_once() {
        let mut config = ObservabilityConfig::default();
        config.logger.min_level = LogLevel::Debug;
        let context = ObservabilityContext::new(config);

        context.init().unwrap();
        assert!(matches!(context.init(), Err(GuardError::AlreadyInitialized)));

        let logger = context.logger().unwrap();
        assert_eq!(logger.min_level(), LogLevel::Debug);
        context.metrics().unwrap().increment("x", 1);
        assert_eq!(context.metrics().unwrap().get_counter("x"), 1);

        let health = context.health().unwrap();
        assert_eq!(health.check_names(), vec!["error_rate".to_string()]);

        context.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_before_init_fails() {
        let context = ObservabilityContext::new(ObservabilityConfig::default());
        assert!(context.shutdown().await.is_err());
    }
}
