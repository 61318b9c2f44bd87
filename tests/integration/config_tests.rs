//! Configuration files and their effect on the guard

#[cfg(test)]
mod tests {
    use adele_guard::config::{IdentitySource, PolicyName, RateLimitStrategy};
    use adele_guard::monitoring::logger::LogLevel;
    use adele_guard::{AdmissionGuard, Config};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
server:
  host: 127.0.0.1
  port: 9090
  admin_token: "a-very-long-admin-token"
rate_limit:
  strategy: sliding_window
  identity:
    type: header
    name: X-User-Id
  exempt_paths: ["/health", "/status"]
  policies:
    read:
      window_ms: 60000
      max_requests: 2
      message: "Slow down"
  routes:
    - prefix: /api/reports
      policy: expensive
      methods: [POST]
  default_policy: read
blocklist:
  auto_block:
    enabled: true
    max_violations: 2
    violation_window_ms: 60000
    block_duration_ms: 120000
observability:
  logger:
    min_level: warn
    buffer_capacity: 50
  metrics:
    histogram_capacity: 10
"#;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_full_config_file() {
        let file = write_config(YAML);
        let config = Config::from_file(file.path()).await.unwrap();

        assert_eq!(config.server.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.rate_limit.strategy, RateLimitStrategy::SlidingWindow);
        assert_eq!(
            config.rate_limit.identity,
            IdentitySource::Header {
                name: "X-User-Id".to_string()
            }
        );
        assert!(config.rate_limit.is_exempt("/status"));
        assert!(!config.rate_limit.is_exempt("/metrics"));

        // Unnamed policies keep their defaults
        assert_eq!(config.rate_limit.policies.read.max_requests, 2);
        assert_eq!(config.rate_limit.policies.auth.max_requests, 10);
        assert_eq!(
            config.rate_limit.policies.auth.window(),
            Duration::from_secs(15 * 60)
        );

        assert_eq!(
            config.rate_limit.policy_for("POST", "/api/reports/monthly"),
            PolicyName::Expensive
        );
        assert_eq!(
            config.rate_limit.policy_for("GET", "/api/reports/monthly"),
            PolicyName::Read
        );
        assert_eq!(config.observability.logger.min_level, LogLevel::Warn);
        assert_eq!(config.observability.metrics.histogram_capacity, 10);
    }

    #[tokio::test]
    async fn test_guard_built_from_file_escalates() {
        let file = write_config(YAML);
        let config = Config::from_file(file.path()).await.unwrap();
        let guard = AdmissionGuard::from_config(&config.rate_limit, &config.blocklist)
            .await
            .unwrap();

        for _ in 0..2 {
            assert!(guard.evaluate(Some("user-1"), PolicyName::Read).await.is_allowed());
        }
        let rejected = guard.evaluate(Some("user-1"), PolicyName::Read).await;
        assert_eq!(rejected.rejection.unwrap().message, "Slow down");
        assert!(!guard.blocklist().is_blocked("user-1"));

        guard.evaluate(Some("user-1"), PolicyName::Read).await;
        assert!(guard.blocklist().is_blocked("user-1"));
    }

    #[tokio::test]
    async fn test_invalid_file_is_rejected() {
        let file = write_config(
            r#"
rate_limit:
  policies:
    api:
      window_ms: 0
      max_requests: 5
"#,
        );
        let err = Config::from_file(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("Configuration error"));
    }

    #[tokio::test]
    async fn test_malformed_yaml_is_rejected() {
        let file = write_config("server: [unterminated");
        assert!(Config::from_file(file.path()).await.is_err());
    }

    #[test]
    fn test_yaml_roundtrip_preserves_routes() {
        let config = Config::from_yaml(YAML).unwrap();
        let reparsed = Config::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(reparsed.rate_limit.routes, config.rate_limit.routes);
        assert_eq!(reparsed.rate_limit.identity, config.rate_limit.identity);
    }
}
