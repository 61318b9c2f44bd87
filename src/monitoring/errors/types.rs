//! Error tracking types

use crate::monitoring::logger::{ErrorInfo, LogContext};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A captured error with the context it was captured in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub id: Uuid,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub error: ErrorInfo,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub context: LogContext,
}

/// One frame of a parsed stack trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    pub function: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colno: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Stacktrace {
    pub frames: Vec<StackFrame>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExceptionValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Stacktrace>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExceptionList {
    pub values: Vec<ExceptionValue>,
}

/// Event body posted to the collection endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    pub event_id: String,
    pub timestamp: String,
    pub platform: &'static str,
    pub level: &'static str,
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    pub exception: ExceptionList,
    pub extra: LogContext,
}
