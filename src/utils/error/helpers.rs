//! Helper functions for creating specific error types

use super::types::GuardError;

impl GuardError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store(message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Name of the variant, used as the `name` of a captured error
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::NotInitialized(_) => "NotInitializedError",
            Self::AlreadyInitialized => "AlreadyInitializedError",
            Self::Store(_) => "StoreError",
            #[cfg(feature = "redis")]
            Self::Redis(_) => "RedisError",
            Self::HttpClient(_) => "HttpClientError",
            Self::Serialization(_) => "SerializationError",
            Self::Yaml(_) => "YamlError",
            Self::Io(_) => "IoError",
            Self::Validation(_) => "ValidationError",
            Self::Unauthorized(_) => "UnauthorizedError",
            Self::NotFound(_) => "NotFoundError",
            Self::Internal(_) => "InternalError",
        }
    }
}
