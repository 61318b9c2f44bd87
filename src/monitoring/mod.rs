//! Monitoring and observability system
//!
//! Structured logging, metrics, error tracking and health checks.

pub mod errors;
pub mod health;
pub mod logger;
pub mod metrics;

mod system;

pub use system::{Observability, ObservabilityContext};
