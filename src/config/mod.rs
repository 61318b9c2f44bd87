//! Configuration management for the guard
//!
//! This module handles loading, validation, and management of all guard configuration.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::monitoring::logger::LogLevel;
use crate::utils::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct for the guard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub blocklist: BlocklistConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GuardError::Config(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_yaml(&content)?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(content)
            .map_err(|e| GuardError::Config(format!("Failed to parse config: {}", e)))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GUARD_*` environment variables on top of the current values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("GUARD_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("GUARD_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| GuardError::Config(format!("Invalid GUARD_PORT: {}", port)))?;
        }
        if let Some(token) = lookup("GUARD_ADMIN_TOKEN") {
            self.server.admin_token = Some(token);
        }
        if let Some(strategy) = lookup("GUARD_RATE_LIMIT_STRATEGY") {
            self.rate_limit.strategy = serde_yaml::from_str(&strategy).map_err(|_| {
                GuardError::Config(format!("Invalid GUARD_RATE_LIMIT_STRATEGY: {}", strategy))
            })?;
        }
        if let Some(url) = lookup("GUARD_REDIS_URL") {
            self.rate_limit.store.redis_url = Some(url);
        }
        if let Some(level) = lookup("GUARD_LOG_LEVEL") {
            self.observability.logger.min_level = level
                .parse::<LogLevel>()
                .map_err(|e| GuardError::Config(format!("Invalid GUARD_LOG_LEVEL: {}", e)))?;
        }
        if let Some(endpoint) = lookup("GUARD_ERROR_ENDPOINT") {
            self.observability.errors.endpoint = Some(endpoint);
        }
        if let Some(environment) = lookup("GUARD_ENVIRONMENT") {
            self.observability.errors.environment = environment;
        }
        Ok(())
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.server
            .validate()
            .map_err(|e| GuardError::Config(format!("Server config error: {}", e)))?;

        self.rate_limit
            .validate()
            .map_err(|e| GuardError::Config(format!("Rate limit config error: {}", e)))?;

        self.blocklist
            .validate()
            .map_err(|e| GuardError::Config(format!("Blocklist config error: {}", e)))?;

        self.observability
            .validate()
            .map_err(|e| GuardError::Config(format!("Observability config error: {}", e)))?;

        debug!("Configuration validation completed");
        Ok(())
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| GuardError::Config(format!("Failed to serialize config to YAML: {}", e)))
    }
}
