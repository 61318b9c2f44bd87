//! Health checking system
//!
//! Concurrent named checks folded into healthy, degraded or unhealthy.

mod checker;
mod checks;
mod types;

#[cfg(test)]
mod tests;

pub use checker::{HealthCheck, HealthChecker, check_fn};
pub use checks::{ErrorRateCheck, StoreCheck};
pub use types::{CheckOutcome, CheckResult, CheckStatus, HealthReport, HealthStatus};
