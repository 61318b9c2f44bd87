//! Common test utilities for adele-guard

use adele_guard::config::{Config, RateLimitConfig};
use adele_guard::server::AppState;
use std::net::SocketAddr;
use std::time::Duration;

pub const ADMIN_TOKEN: &str = "test-admin-token-0123456789";

/// Default configuration with a tiny read quota and block management on
pub fn test_config(read_limit: u32) -> Config {
    let mut config = Config::default();
    config.rate_limit.policies.read = RateLimitConfig::new(Duration::from_secs(60), read_limit);
    config.server.admin_token = Some(ADMIN_TOKEN.to_string());
    config
}

pub async fn test_state(config: Config) -> AppState {
    AppState::new(config).await.expect("state should build")
}

pub fn client(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([192, 0, 2, last_octet], 40000))
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}
