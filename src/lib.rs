//! # adele-guard
//!
//! Request admission and observability for the ADELE backend.
//!
//! - **Admission**: fixed-window, sliding-window and distributed rate
//!   limiters keyed by client identity, an identity blocklist with automatic
//!   escalation, and an [`AdmissionGuard`] combining them per named policy.
//! - **Observability**: a structured logger with an in-memory ring buffer, a
//!   metrics collector with nearest-rank percentiles, an error tracker with
//!   optional forwarding, and a health check aggregator, all held by an
//!   explicitly initialized [`ObservabilityContext`].
//! - **Edge service**: actix-web middleware and introspection routes.
//!
//! ```rust,no_run
//! use adele_guard::{AdmissionGuard, Config, PolicyName};
//!
//! #[tokio::main]
//! async fn main() -> adele_guard::Result<()> {
//!     let config = Config::default();
//!     let guard = AdmissionGuard::from_config(&config.rate_limit, &config.blocklist).await?;
//!
//!     let decision = guard.evaluate(Some("203.0.113.9"), PolicyName::Api).await;
//!     if let Some(rejection) = decision.rejection {
//!         println!("rejected, retry in {}s", rejection.retry_after_secs);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod monitoring;
pub mod server;
pub mod utils;

pub use config::{Config, PolicyName, RateLimitConfig, RateLimitStrategy};
pub use core::rate_limiter::{
    DistributedLimiter, FixedWindowLimiter, MemoryWindowStore, RateLimitResult, RateLimiter,
    SlidingWindowLimiter, WindowStore,
};
pub use core::{AdmissionDecision, AdmissionGuard, IpBlocklist, RejectionReason};
pub use monitoring::ObservabilityContext;
pub use server::{AppState, HttpServer};
pub use utils::error::{GuardError, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
