//! Block management

use super::authorize;
use crate::core::rate_limiter::MAX_DURATION;
use crate::server::state::AppState;
use crate::utils::error::GuardError;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/blocks")
            .route("", web::get().to(list_blocks))
            .route("", web::post().to(create_block))
            .route("/{identity}", web::delete().to(remove_block)),
    );
}

/// Body of `POST /admin/blocks`
#[derive(Debug, Clone, Deserialize)]
pub struct BlockRequest {
    pub identity: String,
    pub duration_secs: u64,
}

async fn list_blocks(req: HttpRequest, state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    authorize(&req, &state)?;
    Ok(HttpResponse::Ok().json(state.guard.blocklist().list()))
}

async fn create_block(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<BlockRequest>,
) -> ActixResult<HttpResponse> {
    authorize(&req, &state)?;

    let identity = body.identity.trim();
    if identity.is_empty() {
        return Err(GuardError::validation("identity must not be empty").into());
    }
    if body.duration_secs == 0 {
        return Err(GuardError::validation("duration_secs must be positive").into());
    }
    if body.duration_secs > MAX_DURATION.as_secs() {
        return Err(GuardError::validation(format!(
            "duration_secs must be at most {}",
            MAX_DURATION.as_secs()
        ))
        .into());
    }

    state
        .guard
        .block(identity, Duration::from_secs(body.duration_secs));
    info!(identity = %identity, duration_secs = body.duration_secs, "Identity blocked");

    Ok(HttpResponse::Created().json(serde_json::json!({
        "identity": identity,
        "duration_secs": body.duration_secs,
    })))
}

async fn remove_block(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: web::Path<String>,
) -> ActixResult<HttpResponse> {
    authorize(&req, &state)?;

    if state.guard.unblock(&identity) {
        info!(identity = %identity, "Identity unblocked");
        Ok(HttpResponse::NoContent().finish())
    } else {
        Err(GuardError::not_found(format!("{} is not blocked", identity)).into())
    }
}
