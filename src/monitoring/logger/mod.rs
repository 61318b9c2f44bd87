//! Structured logging with introspection

mod logger;
mod types;


pub use logger::StructuredLogger;
pub use types::{ErrorInfo, LogContext, LogEntry, LogLevel, PerformanceInfo, RequestInfo};

/// Build a [`LogContext`] from `key => value` pairs
#[macro_export]
macro_rules! log_context {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut context = $crate::monitoring::logger::LogContext::new();
        $(context.insert($key.to_string(), ::serde_json::json!($value));)*
        context
    }};
}
