//! Configuration validation
//!
//! This module provides validation logic for all configuration structures.

use super::models::*;
use crate::core::rate_limiter::MAX_DURATION;
use crate::utils::error::{GuardError, Result};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// Upper bound for every configured window, interval and block duration
pub const MAX_DURATION_MS: u64 = MAX_DURATION.as_millis() as u64;

fn check_duration_ms(what: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(GuardError::Config(format!("{} must be greater than 0", what)));
    }
    if value > MAX_DURATION_MS {
        return Err(GuardError::Config(format!(
            "{} must be at most {} ms",
            what, MAX_DURATION_MS
        )));
    }
    Ok(())
}

/// Trait for validating configuration structures
pub trait Validate {
    /// Validate the configuration
    fn validate(&self) -> Result<()>;
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        debug!("Validating server configuration");

        if self.host.is_empty() {
            return Err(GuardError::Config("Server host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(GuardError::Config(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err(GuardError::Config(
                    "Worker count must be greater than 0".to_string(),
                ));
            }
            if workers > 1000 {
                return Err(GuardError::Config(
                    "Worker count seems too high (>1000)".to_string(),
                ));
            }
        }

        if let Some(token) = &self.admin_token {
            if token.len() < 16 {
                return Err(GuardError::Config(
                    "Admin token must be at least 16 characters".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl Validate for RateLimitConfig {
    fn validate(&self) -> Result<()> {
        check_duration_ms("Rate limit window", self.window_ms)?;

        if self.max_requests == 0 {
            return Err(GuardError::Config(
                "Rate limit max_requests must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Validate for RateLimitSettings {
    fn validate(&self) -> Result<()> {
        debug!("Validating rate limit configuration");

        for (name, policy) in self.policies.iter() {
            policy
                .validate()
                .map_err(|e| GuardError::Config(format!("Policy '{}': {}", name, e)))?;
        }

        check_duration_ms("Maintenance interval", self.maintenance_interval_ms)?;

        if self.max_tracked_keys == Some(0) {
            return Err(GuardError::Config(
                "max_tracked_keys must be greater than 0 when set".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for rule in &self.routes {
            if !rule.prefix.starts_with('/') {
                return Err(GuardError::Config(format!(
                    "Route prefix '{}' must start with '/'",
                    rule.prefix
                )));
            }
            let mut methods = rule.methods.clone();
            methods.sort();
            if !seen.insert((rule.prefix.clone(), methods)) {
                return Err(GuardError::Config(format!(
                    "Duplicate route rule for prefix '{}'",
                    rule.prefix
                )));
            }
        }

        for path in &self.exempt_paths {
            if !path.starts_with('/') {
                return Err(GuardError::Config(format!(
                    "Exempt path '{}' must start with '/'",
                    path
                )));
            }
        }

        if let IdentitySource::Header { name } = &self.identity {
            if name.trim().is_empty() {
                return Err(GuardError::Config(
                    "Identity header name cannot be empty".to_string(),
                ));
            }
        }

        if let Some(url) = &self.store.redis_url {
            let parsed = Url::parse(url)
                .map_err(|e| GuardError::Config(format!("Invalid Redis URL: {}", e)))?;
            if !matches!(parsed.scheme(), "redis" | "rediss") {
                return Err(GuardError::Config(format!(
                    "Redis URL must use redis:// or rediss:// scheme, got: {}",
                    parsed.scheme()
                )));
            }
        }

        Ok(())
    }
}

impl Validate for BlocklistConfig {
    fn validate(&self) -> Result<()> {
        let auto = &self.auto_block;
        if auto.enabled {
            if auto.max_violations == 0 {
                return Err(GuardError::Config(
                    "Auto-block max_violations must be greater than 0".to_string(),
                ));
            }
            check_duration_ms("Auto-block violation window", auto.violation_window_ms)?;
            check_duration_ms("Auto-block duration", auto.block_duration_ms)?;
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> Result<()> {
        debug!("Validating observability configuration");

        if self.logger.buffer_capacity == 0 {
            return Err(GuardError::Config(
                "Log buffer capacity must be greater than 0".to_string(),
            ));
        }

        if self.metrics.histogram_capacity == 0 {
            return Err(GuardError::Config(
                "Histogram capacity must be greater than 0".to_string(),
            ));
        }

        let errors = &self.errors;
        if errors.buffer_capacity == 0 || errors.queue_capacity == 0 {
            return Err(GuardError::Config(
                "Error tracker capacities must be greater than 0".to_string(),
            ));
        }

        if let Some(endpoint) = &errors.endpoint {
            let url = Url::parse(endpoint).map_err(|e| {
                GuardError::Config(format!("Error endpoint has invalid URL format: {}", e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(GuardError::Config(format!(
                    "Error endpoint must use http:// or https:// scheme, got: {}",
                    url.scheme()
                )));
            }
        }

        if errors.timeout_ms == 0 {
            return Err(GuardError::Config(
                "Error forwarding timeout must be greater than 0".to_string(),
            ));
        }

        if self.health.check_timeout_ms == 0 {
            return Err(GuardError::Config(
                "Health check timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
