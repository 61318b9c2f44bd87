//! Observability configuration

use super::*;
use crate::monitoring::logger::LogLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logger: LoggerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub errors: ErrorTrackingConfig,
    #[serde(default)]
    pub health: HealthConfig,
}

/// Structured logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Entries below this level are neither buffered nor emitted
    #[serde(default)]
    pub min_level: LogLevel,
    /// Ring buffer capacity
    #[serde(default = "default_log_capacity")]
    pub buffer_capacity: usize,
    /// Format subscriber output as JSON
    #[serde(default)]
    pub json: bool,
    /// Service name attached to every emitted entry
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::default(),
            buffer_capacity: default_log_capacity(),
            json: false,
            service_name: default_service_name(),
        }
    }
}

/// Metrics collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Samples retained per histogram
    #[serde(default = "default_histogram_capacity")]
    pub histogram_capacity: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            histogram_capacity: default_histogram_capacity(),
        }
    }
}

/// Error tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorTrackingConfig {
    /// Ring buffer capacity
    #[serde(default = "default_error_capacity")]
    pub buffer_capacity: usize,
    /// Collection endpoint. Forwarding is disabled when unset.
    pub endpoint: Option<String>,
    /// Sent as a bearer token to the endpoint
    pub auth_token: Option<String>,
    #[serde(default = "default_environment")]
    pub environment: String,
    pub release: Option<String>,
    /// Pending forwards beyond this are dropped
    #[serde(default = "default_sink_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_sink_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ErrorTrackingConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_error_capacity(),
            endpoint: None,
            auth_token: None,
            environment: default_environment(),
            release: None,
            queue_capacity: default_sink_queue_capacity(),
            timeout_ms: default_sink_timeout_ms(),
        }
    }
}

impl ErrorTrackingConfig {
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Health aggregator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// A check running longer than this fails
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,
    /// Reported version, defaults to the crate version
    pub version: Option<String>,
    /// Captured errors within this window are counted by the error-rate check
    #[serde(default = "default_error_rate_window_secs")]
    pub error_rate_window_secs: u64,
    /// The error-rate check warns at this many errors per window
    #[serde(default = "default_error_rate_warn_threshold")]
    pub error_rate_warn_threshold: usize,
}

fn default_error_rate_window_secs() -> u64 {
    300
}

fn default_error_rate_warn_threshold() -> usize {
    25
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_timeout_ms: default_check_timeout_ms(),
            version: None,
            error_rate_window_secs: default_error_rate_window_secs(),
            error_rate_warn_threshold: default_error_rate_warn_threshold(),
        }
    }
}

impl HealthConfig {
    #[inline]
    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.check_timeout_ms)
    }

    pub fn version(&self) -> String {
        self.version
            .clone()
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
    }
}
