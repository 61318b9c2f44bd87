//! Error capture and forwarding

mod stack;
mod tracker;
mod types;


pub use stack::parse_stack;
pub use tracker::{ErrorTracker, HttpErrorSink};
pub use types::{ErrorEvent, ErrorRecord, StackFrame};
