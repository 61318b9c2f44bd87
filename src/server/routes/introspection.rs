//! Metrics, recent logs and recent errors
//!
//! Logs and errors carry client identities, so they sit behind the admin
//! token when one is configured.

use super::{LimitQuery, authorize};
use crate::server::state::AppState;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics))
        .route("/logs", web::get().to(recent_logs))
        .route("/errors", web::get().to(recent_errors));
}

async fn metrics(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.observability.metrics()?.summary()))
}

async fn recent_logs(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<LimitQuery>,
) -> ActixResult<HttpResponse> {
    authorize(&req, &state)?;
    let logs = state.observability.logger()?.recent_logs(query.limit());
    Ok(HttpResponse::Ok().json(logs))
}

async fn recent_errors(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<LimitQuery>,
) -> ActixResult<HttpResponse> {
    authorize(&req, &state)?;
    let errors = state.observability.errors()?.recent_errors(query.limit());
    Ok(HttpResponse::Ok().json(errors))
}
