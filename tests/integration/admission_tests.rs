//! Admission middleware through the HTTP surface

#[cfg(test)]
mod tests {
    use crate::common::{client, test_config, test_state};
    use actix_web::http::StatusCode;
    use actix_web::{test, web};
    use adele_guard::config::IdentitySource;
    use adele_guard::server::HttpServer;
    use std::time::Duration;

    #[actix_web::test]
    async fn test_allowed_request_carries_headers() {
        let state = test_state(test_config(2)).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let req = test::TestRequest::get()
            .uri("/api/ping")
            .peer_addr(client(1))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::OK);
        let headers = res.headers();
        assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "2");
        assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "1");
        assert_eq!(headers.get("x-ratelimit-reset").unwrap(), "60");
        assert!(headers.get("retry-after").is_none());
    }

    #[actix_web::test]
    async fn test_exhausted_quota_returns_429_body() {
        let state = test_state(test_config(2)).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        for _ in 0..2 {
            let req = test::TestRequest::get()
                .uri("/api/ping")
                .peer_addr(client(2))
                .to_request();
            assert!(test::call_service(&app, req).await.status().is_success());
        }

        let req = test::TestRequest::get()
            .uri("/api/ping")
            .peer_addr(client(2))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers().get("x-ratelimit-remaining").unwrap(), "0");
        assert!(res.headers().get("retry-after").is_some());

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "rate_limit_exceeded");
        assert!(body["message"].as_str().is_some());
        assert!(body["retryAfter"].as_u64().unwrap() >= 1);

        // Other identities keep their own quota
        let req = test::TestRequest::get()
            .uri("/api/ping")
            .peer_addr(client(3))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_blocked_identity_returns_403() {
        let state = test_state(test_config(50)).await;
        state
            .guard
            .block(&client(4).ip().to_string(), Duration::from_secs(120));
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let req = test::TestRequest::get()
            .uri("/api/ping")
            .peer_addr(client(4))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert!(res.headers().get("x-ratelimit-limit").is_none());
        let retry_after: u64 = res
            .headers()
            .get("retry-after")
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!((119..=120).contains(&retry_after));

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["error"], "ip_blocked");
    }

    #[actix_web::test]
    async fn test_exempt_paths_skip_admission() {
        let state = test_state(test_config(1)).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        for _ in 0..3 {
            let req = test::TestRequest::get()
                .uri("/metrics")
                .peer_addr(client(5))
                .to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK);
            assert!(res.headers().get("x-ratelimit-limit").is_none());
        }
    }

    #[actix_web::test]
    async fn test_route_picks_policy() {
        let mut config = test_config(50);
        config.rate_limit.policies.auth =
            adele_guard::RateLimitConfig::new(Duration::from_secs(900), 1);
        let state = test_state(config).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        // Unrouted handler answers 404 but the auth policy is still consulted
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .peer_addr(client(6))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.headers().get("x-ratelimit-limit").unwrap(), "1");

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .peer_addr(client(6))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers().get("retry-after").unwrap(), "900");

        // Read quota is untouched
        let req = test::TestRequest::get()
            .uri("/api/ping")
            .peer_addr(client(6))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers().get("x-ratelimit-limit").unwrap(), "50");
    }

    #[actix_web::test]
    async fn test_requests_without_peer_share_unknown_key() {
        let state = test_state(test_config(1)).await;
        let guard = state.guard.clone();
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let req = test::TestRequest::get().uri("/api/ping").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        let req = test::TestRequest::get().uri("/api/ping").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::TOO_MANY_REQUESTS
        );

        let status = guard
            .status("unknown", adele_guard::PolicyName::Read)
            .await
            .unwrap();
        assert_eq!(status.remaining, 0);
    }

    #[actix_web::test]
    async fn test_rotating_forwarded_prefix_cannot_escape_quota() {
        let mut config = test_config(2);
        config.rate_limit.identity = IdentitySource::ForwardedFor { trusted_hops: 1 };
        let state = test_state(config).await;
        let app = test::init_service(HttpServer::create_app(web::Data::new(state))).await;

        let mut statuses = Vec::new();
        for spoofed in ["1.1.1.1", "2.2.2.2", "3.3.3.3"] {
            let req = test::TestRequest::get()
                .uri("/api/ping")
                .peer_addr(client(10))
                .insert_header(("X-Forwarded-For", format!("{}, 198.51.100.4", spoofed)))
                .to_request();
            statuses.push(test::call_service(&app, req).await.status());
        }

        assert_eq!(
            statuses,
            vec![
                StatusCode::OK,
                StatusCode::OK,
                StatusCode::TOO_MANY_REQUESTS
            ]
        );
    }
}
