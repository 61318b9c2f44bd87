//! Request admission: rate limiting and identity blocking

pub mod blocklist;
pub mod guard;
pub mod rate_limiter;


pub use blocklist::{BlockedEntry, IpBlocklist, ViolationTracker};
pub use guard::{AdmissionDecision, AdmissionGuard, Rejection, RejectionBody, RejectionReason};
