//! Health checking types and data structures

use serde::Serialize;

/// Result of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Aggregate status of all checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Any fail is unhealthy, otherwise any warn is degraded
    pub fn fold<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = CheckStatus>,
    {
        let mut overall = HealthStatus::Healthy;
        for status in statuses {
            match status {
                CheckStatus::Fail => return HealthStatus::Unhealthy,
                CheckStatus::Warn => overall = HealthStatus::Degraded,
                CheckStatus::Pass => {}
            }
        }
        overall
    }
}

/// What a check reports about itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub status: CheckStatus,
    pub message: Option<String>,
}

impl CheckOutcome {
    pub fn pass() -> Self {
        Self {
            status: CheckStatus::Pass,
            message: None,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Warn,
            message: Some(message.into()),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Fail,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Recorded result of one named check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Aggregated health output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    /// Seconds since the checker was created
    pub uptime: u64,
    pub checks: Vec<CheckResult>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status != HealthStatus::Unhealthy
    }
}
