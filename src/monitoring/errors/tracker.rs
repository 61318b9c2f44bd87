//! Error tracker with a local ring and asynchronous forwarding

use super::stack::parse_stack;
use super::types::{ErrorEvent, ErrorRecord, ExceptionList, ExceptionValue, Stacktrace};
use crate::config::ErrorTrackingConfig;
use crate::monitoring::logger::{ErrorInfo, LogContext};
use crate::monitoring::metrics::{BoundedPush, tail};
use crate::utils::error::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// HTTP collection endpoint for captured errors
pub struct HttpErrorSink {
    client: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
    environment: String,
    release: Option<String>,
}

impl HttpErrorSink {
    pub fn new(config: &ErrorTrackingConfig, endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            auth_token: config.auth_token.clone(),
            environment: config.environment.clone(),
            release: config.release.clone(),
        })
    }

    /// Event body for `record`
    pub fn event(&self, record: &ErrorRecord) -> ErrorEvent {
        let frames = record
            .error
            .stack
            .as_deref()
            .map(parse_stack)
            .unwrap_or_default();

        ErrorEvent {
            event_id: record.id.simple().to_string(),
            timestamp: record.timestamp.to_rfc3339(),
            platform: "rust",
            level: "error",
            environment: self.environment.clone(),
            release: self.release.clone(),
            exception: ExceptionList {
                values: vec![ExceptionValue {
                    kind: record.error.name.clone(),
                    value: record.error.message.clone(),
                    stacktrace: (!frames.is_empty()).then_some(Stacktrace { frames }),
                }],
            },
            extra: record.context.clone(),
        }
    }

    /// Post one event. A single attempt, no retries.
    pub async fn send(&self, record: &ErrorRecord) -> Result<()> {
        let mut request = self.client.post(&self.endpoint).json(&self.event(record));
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        request.send().await?.error_for_status()?;
        Ok(())
    }
}

/// Captures errors into a bounded ring and optionally forwards them
///
/// Forwarding runs on a background task fed through a bounded queue, so a
/// slow or failing endpoint never blocks `capture`. Failed forwards are
/// logged at warn and dropped.
pub struct ErrorTracker {
    records: Arc<Mutex<VecDeque<ErrorRecord>>>,
    capacity: usize,
    sender: Mutex<Option<mpsc::Sender<ErrorRecord>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ErrorTracker {
    /// Local-only tracker keeping `capacity` records
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(256)))),
            capacity,
            sender: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Tracker per `config`, forwarding to its endpoint when one is set.
    /// Must be called inside a tokio runtime when forwarding is enabled.
    pub fn from_config(config: &ErrorTrackingConfig) -> Result<Self> {
        let tracker = Self::new(config.buffer_capacity);
        if let Some(endpoint) = &config.endpoint {
            let sink = HttpErrorSink::new(config, endpoint.clone())?;
            tracker.start_forwarding(sink, config.queue_capacity);
            info!(environment = %config.environment, "Error forwarding enabled");
        }
        Ok(tracker)
    }

    fn start_forwarding(&self, sink: HttpErrorSink, queue_capacity: usize) {
        let (sender, mut receiver) = mpsc::channel::<ErrorRecord>(queue_capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(record) = receiver.recv().await {
                match sink.send(&record).await {
                    Ok(()) => debug!(error_id = %record.id, "Forwarded error event"),
                    Err(e) => warn!(
                        error_id = %record.id,
                        error = %e,
                        "Failed to forward error event"
                    ),
                }
            }
        });
        *self.sender.lock() = Some(sender);
        *self.worker.lock() = Some(handle);
    }

    pub fn is_forwarding(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Store `error` and queue it for forwarding, returning its id
    pub fn capture(&self, error: ErrorInfo, context: LogContext) -> Uuid {
        let record = ErrorRecord {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            error,
            context,
        };
        let id = record.id;

        // The request log already reports failed requests at error level
        warn!(
            error_id = %id,
            name = %record.error.name,
            "Captured error: {}",
            record.error.message
        );

        let forward = self.sender.lock().clone();
        if let Some(sender) = forward {
            match sender.try_send(record.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(error_id = %id, "Error forwarding queue full, event not forwarded");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(error_id = %id, "Error forwarding stopped, event not forwarded");
                }
            }
        }

        self.records.lock().push_bounded(record, self.capacity);
        id
    }

    /// Capture a Rust error value
    pub fn capture_error<E>(&self, err: &E, context: LogContext) -> Uuid
    where
        E: std::error::Error + ?Sized,
    {
        self.capture(ErrorInfo::from_error(err), context)
    }

    /// Up to `n` most recent records, oldest first
    pub fn recent_errors(&self, n: usize) -> Vec<ErrorRecord> {
        tail(&self.records.lock(), n)
    }

    /// Retained records captured at or after `since`
    pub fn error_count_since(&self, since: chrono::DateTime<chrono::Utc>) -> usize {
        self.records
            .lock()
            .iter()
            .rev()
            .take_while(|record| record.timestamp >= since)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Stop accepting forwards and wait for queued events to be sent
    pub async fn shutdown(&self) {
        self.sender.lock().take();
        let worker = self.worker.lock().take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                warn!(error = %e, "Error forwarding task ended abnormally");
            }
        }
    }
}
