//! Health, introspection and block management endpoints

#[cfg(test)]
mod tests {
    use crate::common::{ADMIN_TOKEN, bearer, client, test_config, test_state};
    use actix_web::http::StatusCode;
    use actix_web::{test, web};
    use adele_guard::monitoring::health::{CheckOutcome, check_fn};
    use adele_guard::server::HttpServer;

    #[actix_web::test]
    async fn test_health_reports_checks() {
        let state = test_state(test_config(10)).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], adele_guard::VERSION);
        assert!(body["uptime"].is_u64());
        assert!(body["timestamp"].is_string());
        let checks = body["checks"].as_array().unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0]["name"], "error_rate");
        assert_eq!(checks[0]["status"], "pass");
    }

    #[actix_web::test]
    async fn test_health_degraded_still_200_unhealthy_503() {
        let state = test_state(test_config(10)).await;
        let health = state.observability.health().unwrap().clone();
        health.register(
            "cache",
            check_fn(|| async { Ok(CheckOutcome::warn("slow")) }),
        );
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["status"], "degraded");

        health.register(
            "database",
            check_fn(|| async { Ok(CheckOutcome::fail("connection refused")) }),
        );
        let req = test::TestRequest::get().uri("/health").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["status"], "unhealthy");
    }

    #[actix_web::test]
    async fn test_metrics_record_requests_and_decisions() {
        let state = test_state(test_config(1)).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        for _ in 0..2 {
            let req = test::TestRequest::get()
                .uri("/api/ping")
                .peer_addr(client(20))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["counters"]["guard.allowed"], 1);
        assert_eq!(body["counters"]["guard.rate_limited"], 1);
        assert_eq!(body["counters"]["http.requests"], 2);
        assert_eq!(body["counters"]["http.responses.2xx"], 1);
        assert_eq!(body["counters"]["http.responses.4xx"], 1);

        let duration = &body["histograms"]["http.request.duration_ms"];
        assert_eq!(duration["count"], 2);
        assert!(duration["p99"].as_f64().unwrap() >= duration["p50"].as_f64().unwrap());
    }

    #[actix_web::test]
    async fn test_logs_endpoint_returns_request_entries() {
        let state = test_state(test_config(10)).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        for _ in 0..3 {
            let req = test::TestRequest::get()
                .uri("/api/ping")
                .peer_addr(client(21))
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::get()
            .uri("/logs?limit=2")
            .insert_header(bearer(ADMIN_TOKEN))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let entries = body.as_array().unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["level"], "info");
        assert_eq!(entries[1]["request"]["path"], "/api/ping");
        assert_eq!(entries[1]["request"]["client"], "192.0.2.21");
        assert!(entries[1]["performance"]["duration_ms"].is_number());
    }

    #[actix_web::test]
    async fn test_errors_endpoint_lists_captures() {
        let state = test_state(test_config(10)).await;
        let errors = state.observability.errors().unwrap().clone();
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let req = test::TestRequest::get()
            .uri("/errors")
            .insert_header(bearer(ADMIN_TOKEN))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(body.as_array().unwrap().is_empty());

        errors.capture(
            adele_guard::monitoring::logger::ErrorInfo::new("UpstreamError", "timeout"),
            Default::default(),
        );
        let req = test::TestRequest::get()
            .uri("/errors?limit=5")
            .insert_header(bearer(ADMIN_TOKEN))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["error"]["name"], "UpstreamError");
    }

    #[actix_web::test]
    async fn test_admin_block_lifecycle() {
        let state = test_state(test_config(10)).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;
        let target = client(30).ip().to_string();

        let req = test::TestRequest::post()
            .uri("/admin/blocks")
            .set_json(serde_json::json!({ "identity": target, "duration_secs": 300 }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::post()
            .uri("/admin/blocks")
            .insert_header(bearer(ADMIN_TOKEN))
            .set_json(serde_json::json!({ "identity": target, "duration_secs": 300 }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::get()
            .uri("/api/ping")
            .peer_addr(client(30))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::get()
            .uri("/admin/blocks")
            .insert_header(bearer(ADMIN_TOKEN))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["identity"], target);

        let req = test::TestRequest::delete()
            .uri(&format!("/admin/blocks/{}", target))
            .insert_header(bearer(ADMIN_TOKEN))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::delete()
            .uri(&format!("/admin/blocks/{}", target))
            .insert_header(bearer(ADMIN_TOKEN))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/api/ping")
            .peer_addr(client(30))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_admin_routes_absent_without_token() {
        let mut config = test_config(10);
        config.server.admin_token = None;
        let state = test_state(config).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let req = test::TestRequest::get()
            .uri("/admin/blocks")
            .insert_header(bearer(ADMIN_TOKEN))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_logs_and_errors_require_admin_token_when_set() {
        let state = test_state(test_config(10)).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        for uri in ["/logs", "/errors"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            assert_eq!(
                test::call_service(&app, req).await.status(),
                StatusCode::UNAUTHORIZED,
                "{} without token",
                uri
            );

            let req = test::TestRequest::get()
                .uri(uri)
                .insert_header(bearer("not-the-admin-token"))
                .to_request();
            assert_eq!(
                test::call_service(&app, req).await.status(),
                StatusCode::UNAUTHORIZED,
                "{} with wrong token",
                uri
            );
        }

        let req = test::TestRequest::get().uri("/metrics").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_logs_and_errors_open_without_admin_token() {
        let mut config = test_config(10);
        config.server.admin_token = None;
        let state = test_state(config).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        for uri in ["/logs", "/errors"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        }
    }

    #[actix_web::test]
    async fn test_admin_block_rejects_oversized_duration() {
        let state = test_state(test_config(10)).await;
        let guard = state.guard.clone();
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let req = test::TestRequest::post()
            .uri("/admin/blocks")
            .insert_header(bearer(ADMIN_TOKEN))
            .set_json(serde_json::json!({ "identity": "203.0.113.7", "duration_secs": u64::MAX }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(guard.blocklist().is_empty());
    }
}
