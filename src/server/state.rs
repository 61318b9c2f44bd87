//! Application state shared across HTTP handlers

use crate::config::Config;
use crate::core::AdmissionGuard;
use crate::monitoring::ObservabilityContext;
use crate::monitoring::health::StoreCheck;
use crate::utils::error::Result;
use std::sync::Arc;

/// HTTP server state shared across handlers
///
/// All fields are wrapped in Arc so workers share a single guard and a
/// single set of observability buffers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration (shared read-only)
    pub config: Arc<Config>,
    /// Admission guard
    pub guard: Arc<AdmissionGuard>,
    /// Logger, metrics, error tracker and health checker
    pub observability: Arc<ObservabilityContext>,
}

impl AppState {
    /// Initialize observability and build the guard from `config`
    pub async fn new(config: Config) -> Result<Self> {
        let observability = Arc::new(ObservabilityContext::new(config.observability.clone()));
        observability.init()?;

        let components = observability.components()?;
        let guard = AdmissionGuard::from_config(&config.rate_limit, &config.blocklist)
            .await?
            .with_metrics(components.metrics.clone());

        if let Some(store) = guard.shared_store() {
            components
                .health
                .register("store", Arc::new(StoreCheck::new(store.clone())));
        }

        Ok(Self::from_parts(config, guard, observability))
    }

    /// Assemble state from already built components
    pub fn from_parts(
        config: Config,
        guard: AdmissionGuard,
        observability: Arc<ObservabilityContext>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            guard: Arc::new(guard),
            observability,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop background work and flush pending error forwards
    pub async fn shutdown(&self) -> Result<()> {
        self.guard.shutdown();
        self.observability.shutdown().await
    }
}
