//! Error forwarding against a mock collection endpoint

#[cfg(test)]
mod tests {
    use adele_guard::GuardError;
    use adele_guard::config::{ErrorTrackingConfig, ObservabilityConfig};
    use adele_guard::log_context;
    use adele_guard::monitoring::ObservabilityContext;
    use adele_guard::monitoring::errors::ErrorTracker;
    use adele_guard::monitoring::logger::ErrorInfo;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn forwarding_config(server: &MockServer) -> ErrorTrackingConfig {
        ErrorTrackingConfig {
            endpoint: Some(format!("{}/api/events", server.uri())),
            auth_token: Some("sink-token".to_string()),
            release: Some("1.2.3".to_string()),
            ..ErrorTrackingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_captured_error_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/events"))
            .and(header("authorization", "Bearer sink-token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let tracker = ErrorTracker::from_config(&forwarding_config(&server)).unwrap();
        assert!(tracker.is_forwarding());

        let id = tracker.capture(
            ErrorInfo::new("UpstreamError", "timeout after 5s")
                .with_stack("   0: adele::handler\n             at ./src/handler.rs:10:5"),
            log_context! { "route" => "/api/chat" },
        );
        tracker.shutdown().await;

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let event: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(event["event_id"], id.simple().to_string());
        assert_eq!(event["platform"], "rust");
        assert_eq!(event["level"], "error");
        assert_eq!(event["environment"], "development");
        assert_eq!(event["release"], "1.2.3");
        assert_eq!(event["extra"]["route"], "/api/chat");

        let exception = &event["exception"]["values"][0];
        assert_eq!(exception["type"], "UpstreamError");
        assert_eq!(exception["value"], "timeout after 5s");
        let frame = &exception["stacktrace"]["frames"][0];
        assert_eq!(frame["function"], "adele::handler");
        assert_eq!(frame["filename"], "./src/handler.rs");
        assert_eq!(frame["lineno"], 10);
    }

    #[tokio::test]
    async fn test_failing_endpoint_is_tried_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/events"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let tracker = ErrorTracker::from_config(&forwarding_config(&server)).unwrap();
        let error = GuardError::store("connection reset");
        tracker.capture(ErrorInfo::from(&error), Default::default());
        tracker.shutdown().await;

        // Local record survives the failed forward
        let records = tracker.recent_errors(10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].error.name, "StoreError");
    }

    #[tokio::test]
    async fn test_context_shutdown_flushes_forwards() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/events"))
            .respond_with(ResponseTemplate::new(202))
            .expect(3)
            .mount(&server)
            .await;

        let config = ObservabilityConfig {
            errors: forwarding_config(&server),
            ..ObservabilityConfig::default()
        };
        let context = ObservabilityContext::new(config);
        context.init().unwrap();

        let errors = context.errors().unwrap();
        for attempt in 0..3 {
            errors.capture(
                ErrorInfo::new("RetryableError", format!("attempt {}", attempt)),
                Default::default(),
            );
        }
        context.shutdown().await.unwrap();

        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }
}
