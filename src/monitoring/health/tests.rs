//! Tests for health checking

use super::*;
use crate::core::rate_limiter::MemoryWindowStore;
use crate::monitoring::errors::ErrorTracker;
use crate::monitoring::logger::{ErrorInfo, LogContext};
use crate::utils::error::GuardError;
use std::sync::Arc;
use std::time::Duration;

fn fixed(status: CheckStatus) -> Arc<dyn HealthCheck> {
    check_fn(move || async move {
        Ok(CheckOutcome {
            status,
            message: None,
        })
    })
}

fn checker() -> HealthChecker {
    HealthChecker::new("1.0.0-test", Duration::from_millis(200))
}

#[test]
fn test_fold() {
    use CheckStatus::*;
    assert_eq!(HealthStatus::fold([Pass, Warn]), HealthStatus::Degraded);
    assert_eq!(HealthStatus::fold([Pass, Fail]), HealthStatus::Unhealthy);
    assert_eq!(HealthStatus::fold([Pass, Pass]), HealthStatus::Healthy);
    assert_eq!(HealthStatus::fold([Warn, Fail, Warn]), HealthStatus::Unhealthy);
    assert_eq!(HealthStatus::fold([]), HealthStatus::Healthy);
}

#[tokio::test]
async fn test_report_shape() {
    let checker = checker();
    checker.register("a", fixed(CheckStatus::Pass));
    checker.register("b", fixed(CheckStatus::Warn));

    let report = checker.check_all().await;
    assert_eq!(report.status, HealthStatus::Degraded);
    assert_eq!(report.version, "1.0.0-test");
    assert_eq!(report.checks.len(), 2);
    assert!(report.is_healthy());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"][1]["status"], "warn");
    assert!(json["uptime"].is_u64());
    assert!(json["timestamp"].is_string());
    assert_eq!(checker.last_report(), Some(report));
}

#[tokio::test]
async fn test_error_counts_as_fail() {
    let checker = checker();
    checker.register("ok", fixed(CheckStatus::Pass));
    checker.register(
        "db",
        check_fn(|| async { Err(GuardError::store("connection refused")) }),
    );

    let report = checker.check_all().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
    let db = report.checks.iter().find(|c| c.name == "db").unwrap();
    assert_eq!(db.status, CheckStatus::Fail);
    assert!(db.message.as_deref().unwrap().contains("connection refused"));
    let ok = report.checks.iter().find(|c| c.name == "ok").unwrap();
    assert_eq!(ok.status, CheckStatus::Pass);
}

#[tokio::test]
async fn test_panic_is_isolated() {
    let checker = checker();
    checker.register("ok", fixed(CheckStatus::Pass));
    checker.register(
        "broken",
        check_fn(|| async {
            if true {
                panic!("check exploded");
            }
            Ok(CheckOutcome::pass())
        }),
    );

    let report = checker.check_all().await;
    let broken = report.checks.iter().find(|c| c.name == "broken").unwrap();
    assert_eq!(broken.status, CheckStatus::Fail);
    assert!(broken.message.as_deref().unwrap().contains("check exploded"));
    assert_eq!(report.checks.len(), 2);
}

#[tokio::test]
async fn test_timeout_is_fail() {
    let checker = HealthChecker::new("v", Duration::from_millis(20));
    checker.register(
        "slow",
        check_fn(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(CheckOutcome::pass())
        }),
    );

    let report = checker.check_all().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert!(report.checks[0].message.as_deref().unwrap().contains("timed out"));
    assert!(report.checks[0].duration_ms < 5000.0);
}

#[tokio::test]
async fn test_checks_run_concurrently() {
    let checker = checker();
    for name in ["a", "b", "c", "d"] {
        checker.register(
            name,
            check_fn(|| async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(CheckOutcome::pass())
            }),
        );
    }

    let start = std::time::Instant::now();
    let report = checker.check_all().await;
    assert_eq!(report.status, HealthStatus::Healthy);
    assert!(start.elapsed() < Duration::from_millis(190));
}

#[tokio::test]
async fn test_register_replaces_and_unregister() {
    let checker = checker();
    checker.register("a", fixed(CheckStatus::Fail));
    checker.register("a", fixed(CheckStatus::Pass));
    assert_eq!(checker.check_names(), vec!["a".to_string()]);
    assert_eq!(checker.check_all().await.status, HealthStatus::Healthy);

    assert!(checker.unregister("a"));
    assert!(!checker.unregister("a"));
}

#[tokio::test]
async fn test_error_rate_check() {
    let tracker = Arc::new(ErrorTracker::new(100));
    let check = ErrorRateCheck::new(tracker.clone(), Duration::from_secs(300), 3);

    assert_eq!(check.check().await.unwrap().status, CheckStatus::Pass);
    for _ in 0..3 {
        tracker.capture(ErrorInfo::new("E", "e"), LogContext::new());
    }
    let outcome = check.check().await.unwrap();
    assert_eq!(outcome.status, CheckStatus::Warn);
    assert_eq!(outcome.message.as_deref(), Some("3 errors in the last 300s"));
}

#[tokio::test]
async fn test_store_check() {
    let check = StoreCheck::new(Arc::new(MemoryWindowStore::new()));
    let outcome = check.check().await.unwrap();
    assert_eq!(outcome.status, CheckStatus::Pass);
}
