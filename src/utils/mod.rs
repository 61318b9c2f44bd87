//! Utility modules
//!
//! - **error**: crate error type and HTTP mapping
//! - **logging**: tracing subscriber installation

pub mod error;
pub mod logging;
