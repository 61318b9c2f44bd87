//! Structured logger with a bounded in-memory ring

use super::types::{ErrorInfo, LogContext, LogEntry, LogLevel, PerformanceInfo, RequestInfo};
use crate::config::LoggerConfig;
use crate::monitoring::metrics::{BoundedPush, tail};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

struct LoggerShared {
    min_level: LogLevel,
    capacity: usize,
    service: String,
    buffer: Mutex<VecDeque<LogEntry>>,
}

/// Structured logger
///
/// Entries at or above the minimum level are kept in a fixed-capacity ring
/// (oldest evicted first) and emitted through `tracing` at the matching
/// severity with the whole entry attached. Clones and children share the
/// ring.
#[derive(Clone)]
pub struct StructuredLogger {
    shared: Arc<LoggerShared>,
    base_context: LogContext,
}

impl StructuredLogger {
    pub fn new(min_level: LogLevel, capacity: usize) -> Self {
        Self::build(min_level, capacity, env!("CARGO_PKG_NAME").to_string())
    }

    pub fn from_config(config: &LoggerConfig) -> Self {
        Self::build(
            config.min_level,
            config.buffer_capacity,
            config.service_name.clone(),
        )
    }

    fn build(min_level: LogLevel, capacity: usize, service: String) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(LoggerShared {
                min_level,
                capacity,
                service,
                buffer: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            }),
            base_context: LogContext::new(),
        }
    }

    /// Logger that merges `context` into every entry it writes
    pub fn child(&self, context: LogContext) -> Self {
        let mut base_context = self.base_context.clone();
        base_context.extend(context);
        Self {
            shared: self.shared.clone(),
            base_context,
        }
    }

    pub fn min_level(&self) -> LogLevel {
        self.shared.min_level
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.shared.min_level
    }

    pub fn log(
        &self,
        level: LogLevel,
        message: &str,
        context: Option<LogContext>,
        error: Option<ErrorInfo>,
    ) {
        if !self.enabled(level) {
            return;
        }
        let mut entry = LogEntry::new(level, message);
        if let Some(context) = context {
            entry.context = context;
        }
        entry.error = error;
        self.write(entry);
    }

    /// Record a fully built entry
    pub fn write(&self, mut entry: LogEntry) {
        if !self.enabled(entry.level) {
            return;
        }
        if !self.base_context.is_empty() {
            let mut context = self.base_context.clone();
            context.extend(std::mem::take(&mut entry.context));
            entry.context = context;
        }

        self.emit(&entry);
        self.shared
            .buffer
            .lock()
            .push_bounded(entry, self.shared.capacity);
    }

    pub fn debug(&self, message: &str, context: Option<LogContext>) {
        self.log(LogLevel::Debug, message, context, None);
    }

    pub fn info(&self, message: &str, context: Option<LogContext>) {
        self.log(LogLevel::Info, message, context, None);
    }

    pub fn warn(&self, message: &str, context: Option<LogContext>) {
        self.log(LogLevel::Warn, message, context, None);
    }

    pub fn error(&self, message: &str, context: Option<LogContext>, error: Option<ErrorInfo>) {
        self.log(LogLevel::Error, message, context, error);
    }

    pub fn fatal(&self, message: &str, context: Option<LogContext>, error: Option<ErrorInfo>) {
        self.log(LogLevel::Fatal, message, context, error);
    }

    /// Log a completed request. Server errors log at error, client errors at
    /// warn, everything else at info. Admission rejections count as outcomes.
    pub fn log_request(&self, request: RequestInfo, status: u16, duration_ms: f64) {
        let level = match status {
            500.. => LogLevel::Error,
            429 | 403 => LogLevel::Info,
            400..=499 => LogLevel::Warn,
            _ => LogLevel::Info,
        };
        if !self.enabled(level) {
            return;
        }

        let mut context = LogContext::new();
        context.insert("status".to_string(), status.into());
        let message = format!("{} {} {}", request.method, request.path, status);

        self.write(
            LogEntry::new(level, message)
                .with_context(context)
                .with_request(request)
                .with_performance(PerformanceInfo {
                    duration_ms,
                    memory_bytes: None,
                })
                .with_tags(["request"]),
        );
    }

    /// Log the duration of a named operation at info
    pub fn log_performance(&self, operation: &str, duration_ms: f64, context: Option<LogContext>) {
        if !self.enabled(LogLevel::Info) {
            return;
        }
        self.write(
            LogEntry::new(LogLevel::Info, format!("{} completed", operation))
                .with_context(context.unwrap_or_default())
                .with_performance(PerformanceInfo {
                    duration_ms,
                    memory_bytes: None,
                })
                .with_tags(["performance"]),
        );
    }

    /// Up to `n` most recent entries, oldest first
    pub fn recent_logs(&self, n: usize) -> Vec<LogEntry> {
        tail(&self.shared.buffer.lock(), n)
    }

    pub fn clear(&self) {
        self.shared.buffer.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.shared.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    fn emit(&self, entry: &LogEntry) {
        let service = self.shared.service.as_str();
        let payload = serde_json::to_string(entry).unwrap_or_default();
        let message = entry.message.as_str();

        match entry.level {
            LogLevel::Fatal => error!(service, fatal = true, entry = %payload, "{}", message),
            LogLevel::Error => error!(service, entry = %payload, "{}", message),
            LogLevel::Warn => warn!(service, entry = %payload, "{}", message),
            LogLevel::Info => info!(service, entry = %payload, "{}", message),
            LogLevel::Debug => debug!(service, entry = %payload, "{}", message),
        }
    }
}

impl std::fmt::Debug for StructuredLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredLogger")
            .field("min_level", &self.shared.min_level)
            .field("capacity", &self.shared.capacity)
            .field("len", &self.len())
            .finish()
    }
}
