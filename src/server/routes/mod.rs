//! HTTP route modules

pub mod admin;
pub mod health;
pub mod introspection;

use crate::server::middleware::bearer_token;
use crate::server::state::AppState;
use crate::utils::error::GuardError;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;

/// Mount every route. Block management is only mounted when an admin token
/// is configured.
pub fn configure_routes(cfg: &mut web::ServiceConfig, admin_enabled: bool) {
    health::configure_routes(cfg);
    introspection::configure_routes(cfg);
    cfg.route("/api/ping", web::get().to(ping));
    if admin_enabled {
        admin::configure_routes(cfg);
    }
}

/// Require `Authorization: Bearer <admin_token>` when an admin token is
/// configured. Without one every caller passes.
pub(crate) fn authorize(req: &HttpRequest, state: &AppState) -> Result<(), GuardError> {
    let Some(expected) = state.config.server.admin_token.as_deref() else {
        return Ok(());
    };

    match bearer_token(req.headers()) {
        Some(token) if token == expected => Ok(()),
        _ => Err(GuardError::unauthorized("Invalid or missing admin token")),
    }
}

/// `?limit=n` query of the ring buffer endpoints
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    pub const DEFAULT_LIMIT: usize = 100;

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}

/// Cheap guarded endpoint
async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "pong",
        "timestamp": chrono::Utc::now(),
    }))
}
