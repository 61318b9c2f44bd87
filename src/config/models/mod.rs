//! Configuration data models
//!
//! This module defines all configuration structures used by the guard.

pub mod blocklist;
pub mod observability;
pub mod rate_limit;
pub mod server;

pub use blocklist::*;
pub use observability::*;
pub use rate_limit::*;
pub use server::*;

/// Default values for configuration
pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default server port
pub fn default_port() -> u16 {
    8080
}

pub fn default_true() -> bool {
    true
}

/// Interval between lazy sweeps of expired limiter state
pub fn default_maintenance_interval_ms() -> u64 {
    60_000
}

pub fn default_rate_limit_message() -> String {
    "Too many requests, please try again later.".to_string()
}

pub fn default_block_message() -> String {
    "Access from this address has been temporarily blocked.".to_string()
}

pub fn default_key_prefix() -> String {
    "ratelimit:".to_string()
}

pub fn default_log_capacity() -> usize {
    1000
}

pub fn default_histogram_capacity() -> usize {
    1000
}

pub fn default_error_capacity() -> usize {
    100
}

pub fn default_sink_queue_capacity() -> usize {
    256
}

pub fn default_sink_timeout_ms() -> u64 {
    5_000
}

pub fn default_check_timeout_ms() -> u64 {
    5_000
}

pub fn default_service_name() -> String {
    "adele-guard".to_string()
}

pub fn default_environment() -> String {
    "development".to_string()
}
