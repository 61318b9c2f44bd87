//! Integration tests for adele-guard
//!
//! These tests drive the public API and the HTTP surface end to end.

pub mod admission_tests;
pub mod config_tests;
pub mod endpoint_tests;
pub mod error_forwarding_tests;
