//! Error handling for the guard
//!
//! This module defines the error type shared by every component of the crate.

mod helpers;
mod response;
mod types;

pub use response::{ErrorDetail, ErrorResponse};
pub use types::{GuardError, Result};
