//! Request telemetry middleware

use super::helpers::{resolve_identity, status_class};
use crate::monitoring::logger::{ErrorInfo, RequestInfo};
use crate::server::state::AppState;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::web;
use futures::future::{Ready, ready};
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

pub const REQUESTS_COUNTER: &str = "http.requests";
pub const DURATION_HISTOGRAM: &str = "http.request.duration_ms";

/// Times every request, records request metrics and writes a request log
/// entry. Server errors are also captured by the error tracker.
pub struct TelemetryMiddleware;

impl<S, B> Transform<S, ServiceRequest> for TelemetryMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = TelemetryMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TelemetryMiddlewareService { service }))
    }
}

/// Service implementation for telemetry middleware
pub struct TelemetryMiddlewareService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for TelemetryMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let app_state = req.app_data::<web::Data<AppState>>().cloned();
        let request = RequestInfo {
            method: req.method().to_string(),
            path: req.path().to_string(),
            client: app_state
                .as_ref()
                .and_then(|state| resolve_identity(req.request(), &state.config.rate_limit.identity)),
            user_id: None,
        };

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;
            let Some(state) = app_state else {
                return result;
            };
            let Ok(components) = state.observability.components() else {
                return result;
            };

            let duration_ms = start_time.elapsed().as_secs_f64() * 1000.0;
            let status = match &result {
                Ok(res) => res.status().as_u16(),
                Err(err) => err.as_response_error().status_code().as_u16(),
            };

            components.metrics.increment(REQUESTS_COUNTER, 1);
            components
                .metrics
                .increment(&format!("http.responses.{}", status_class(status)), 1);
            components.metrics.timing(DURATION_HISTOGRAM, duration_ms);

            if status >= 500 {
                let message = match &result {
                    Err(err) => err.to_string(),
                    Ok(_) => format!("{} {} returned {}", request.method, request.path, status),
                };
                let context = crate::log_context! {
                    "method" => request.method,
                    "path" => request.path,
                    "status" => status,
                };
                components
                    .errors
                    .capture(ErrorInfo::new("HttpServerError", message), context);
            }

            components.logger.log_request(request, status, duration_ms);
            result
        })
    }
}
