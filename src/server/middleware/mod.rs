//! HTTP middleware implementations
//!
//! - Admission (blocklist and rate limiting)
//! - Telemetry (request metrics, request logs, server error capture)

mod admission;
mod helpers;
mod telemetry;


pub use admission::{AdmissionMiddleware, AdmissionMiddlewareService};
pub use helpers::{bearer_token, resolve_identity, status_class};
pub use telemetry::{TelemetryMiddleware, TelemetryMiddlewareService};
