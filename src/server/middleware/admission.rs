//! Admission middleware

use super::helpers::resolve_identity;
use crate::server::state::AppState;
use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::StatusCode;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{HttpResponse, web};
use futures::future::{Ready, ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use tracing::debug;

/// Consults the admission guard before the request reaches a handler
///
/// Admitted requests get the rate limit headers added to their response.
/// Rejected requests are answered here with the JSON rejection body.
/// Exempt paths pass through untouched.
pub struct AdmissionMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AdmissionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = AdmissionMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdmissionMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

/// Service implementation for admission middleware
pub struct AdmissionMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdmissionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
                return service.call(req).await.map(ServiceResponse::map_into_left_body);
            };

            let settings = &state.config.rate_limit;
            if settings.is_exempt(req.path()) {
                return service.call(req).await.map(ServiceResponse::map_into_left_body);
            }

            let identity = resolve_identity(req.request(), &settings.identity);
            let policy = settings.policy_for(req.method().as_str(), req.path());
            let decision = state.guard.evaluate(identity.as_deref(), policy).await;
            let headers = decision.headers();

            if let Some(rejection) = &decision.rejection {
                debug!(
                    identity = %decision.identity,
                    policy = %policy,
                    reason = rejection.reason.as_str(),
                    path = %req.path(),
                    "Request rejected"
                );
                let status = StatusCode::from_u16(rejection.reason.status_code())
                    .unwrap_or(StatusCode::TOO_MANY_REQUESTS);
                let mut builder = HttpResponse::build(status);
                for header in headers {
                    builder.insert_header(header);
                }
                let response = builder.json(rejection.body());
                return Ok(req.into_response(response).map_into_right_body());
            }

            let mut res = service.call(req).await?;
            for (name, value) in headers {
                if let (Ok(name), Ok(value)) = (
                    HeaderName::from_bytes(name.as_bytes()),
                    HeaderValue::from_str(&value),
                ) {
                    res.headers_mut().insert(name, value);
                }
            }
            Ok(res.map_into_left_body())
        })
    }
}
