//! Error types for the guard

use thiserror::Error;

/// Result type alias for the guard
pub type Result<T> = std::result::Result<T, GuardError>;

/// Main error type for the guard
#[derive(Error, Debug)]
pub enum GuardError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A component was used before `ObservabilityContext::init` ran
    #[error("{0} accessed before initialization")]
    NotInitialized(&'static str),

    /// `ObservabilityContext::init` was called twice
    #[error("Observability context already initialized")]
    AlreadyInitialized,

    /// Shared window store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Redis errors
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or wrong admin credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),
}
