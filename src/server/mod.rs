//! HTTP edge service
//!
//! Wires the admission guard and the observability components into an
//! actix-web application.

pub mod middleware;
pub mod routes;
#[allow(clippy::module_inception)]
pub mod server;
pub mod state;

pub use server::HttpServer;
pub use state::AppState;
