//! Rate limiting configuration

use super::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single limiter policy: how many requests one identity may make per window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Maximum admitted requests per window
    pub max_requests: u32,
    /// Message returned in the rejection payload
    #[serde(default = "default_rate_limit_message")]
    pub message: String,
}

impl RateLimitConfig {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window_ms: window.as_millis() as u64,
            max_requests,
            message: default_rate_limit_message(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[inline]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// 15 minutes, 10 requests
    pub fn auth() -> Self {
        Self::new(Duration::from_secs(15 * 60), 10)
            .with_message("Too many authentication attempts, please try again later.")
    }

    /// 1 minute, 60 requests
    pub fn api() -> Self {
        Self::new(Duration::from_secs(60), 60)
    }

    /// 1 minute, 10 requests
    pub fn expensive() -> Self {
        Self::new(Duration::from_secs(60), 10)
            .with_message("Too many generation requests, please slow down.")
    }

    /// 1 hour, 3 requests
    pub fn password_reset() -> Self {
        Self::new(Duration::from_secs(60 * 60), 3)
            .with_message("Too many password reset requests, please try again later.")
    }

    /// 1 minute, 20 requests
    pub fn upload() -> Self {
        Self::new(Duration::from_secs(60), 20)
            .with_message("Too many uploads, please try again later.")
    }

    /// 1 minute, 200 requests
    pub fn read() -> Self {
        Self::new(Duration::from_secs(60), 200)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::api()
    }
}

/// Names of the built-in limiter policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyName {
    Auth,
    Api,
    Expensive,
    #[serde(alias = "passwordReset")]
    PasswordReset,
    Upload,
    Read,
}

impl PolicyName {
    pub const ALL: [PolicyName; 6] = [
        PolicyName::Auth,
        PolicyName::Api,
        PolicyName::Expensive,
        PolicyName::PasswordReset,
        PolicyName::Upload,
        PolicyName::Read,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyName::Auth => "auth",
            PolicyName::Api => "api",
            PolicyName::Expensive => "expensive",
            PolicyName::PasswordReset => "password_reset",
            PolicyName::Upload => "upload",
            PolicyName::Read => "read",
        }
    }
}

impl std::fmt::Display for PolicyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The named policy table. Every entry can be overridden independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicies {
    #[serde(default = "RateLimitConfig::auth")]
    pub auth: RateLimitConfig,
    #[serde(default = "RateLimitConfig::api")]
    pub api: RateLimitConfig,
    #[serde(default = "RateLimitConfig::expensive")]
    pub expensive: RateLimitConfig,
    #[serde(default = "RateLimitConfig::password_reset", alias = "passwordReset")]
    pub password_reset: RateLimitConfig,
    #[serde(default = "RateLimitConfig::upload")]
    pub upload: RateLimitConfig,
    #[serde(default = "RateLimitConfig::read")]
    pub read: RateLimitConfig,
}

impl Default for RateLimitPolicies {
    fn default() -> Self {
        Self {
            auth: RateLimitConfig::auth(),
            api: RateLimitConfig::api(),
            expensive: RateLimitConfig::expensive(),
            password_reset: RateLimitConfig::password_reset(),
            upload: RateLimitConfig::upload(),
            read: RateLimitConfig::read(),
        }
    }
}

impl RateLimitPolicies {
    pub fn get(&self, name: PolicyName) -> &RateLimitConfig {
        match name {
            PolicyName::Auth => &self.auth,
            PolicyName::Api => &self.api,
            PolicyName::Expensive => &self.expensive,
            PolicyName::PasswordReset => &self.password_reset,
            PolicyName::Upload => &self.upload,
            PolicyName::Read => &self.read,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PolicyName, &RateLimitConfig)> {
        PolicyName::ALL.into_iter().map(move |name| (name, self.get(name)))
    }
}

/// Rate limiting strategy
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStrategy {
    /// In-process fixed window
    #[default]
    FixedWindow,
    /// In-process sliding window log
    SlidingWindow,
    /// Fixed window persisted in a shared key-value store
    Distributed,
}

/// Where the identity key of a request comes from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentitySource {
    /// Socket peer address
    #[default]
    PeerAddr,
    /// Address `trusted_hops` entries from the right of `X-Forwarded-For`.
    ///
    /// Each trusted proxy appends the address it received the request
    /// from, so entries left of that one are client supplied. Falls back
    /// to the peer address when the header has fewer entries.
    ForwardedFor {
        #[serde(default = "default_trusted_hops")]
        trusted_hops: usize,
    },
    /// Value of an arbitrary request header
    Header { name: String },
}

/// Maps a path prefix (and optionally methods) to a named policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    pub prefix: String,
    pub policy: PolicyName,
    /// Empty means every method
    #[serde(default)]
    pub methods: Vec<String>,
}

impl RouteRule {
    pub fn new(prefix: impl Into<String>, policy: PolicyName) -> Self {
        Self {
            prefix: prefix.into(),
            policy,
            methods: Vec::new(),
        }
    }

    pub fn with_methods(mut self, methods: &[&str]) -> Self {
        self.methods = methods.iter().map(|m| m.to_uppercase()).collect();
        self
    }

    pub fn matches(&self, method: &str, path: &str) -> bool {
        path.starts_with(&self.prefix)
            && (self.methods.is_empty() || self.methods.iter().any(|m| m.eq_ignore_ascii_case(method)))
    }
}

fn default_trusted_hops() -> usize {
    1
}

fn default_routes() -> Vec<RouteRule> {
    vec![
        RouteRule::new("/api/auth/forgot-password", PolicyName::PasswordReset),
        RouteRule::new("/api/auth/reset-password", PolicyName::PasswordReset),
        RouteRule::new("/api/auth", PolicyName::Auth),
        RouteRule::new("/api/chat", PolicyName::Expensive).with_methods(&["POST"]),
        RouteRule::new("/api/upload", PolicyName::Upload),
        RouteRule::new("/api", PolicyName::Read).with_methods(&["GET", "HEAD"]),
    ]
}

fn default_exempt_paths() -> Vec<String> {
    vec!["/health".to_string(), "/metrics".to_string()]
}

/// Shared window store settings used by the distributed strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Redis URL. Without it the distributed strategy runs on an in-process store.
    pub redis_url: Option<String>,
    /// Prefix prepended to every identity key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: default_key_prefix(),
        }
    }
}

/// Rate limiting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Enable rate limiting
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Rate limiting strategy
    #[serde(default)]
    pub strategy: RateLimitStrategy,
    /// How the identity key is derived from a request
    #[serde(default)]
    pub identity: IdentitySource,
    /// Paths that bypass admission entirely
    #[serde(default = "default_exempt_paths")]
    pub exempt_paths: Vec<String>,
    /// Expired entries are removed within one interval of expiring
    #[serde(default = "default_maintenance_interval_ms")]
    pub maintenance_interval_ms: u64,
    /// Run the sweep on a tokio interval instead of lazily
    #[serde(default)]
    pub background_sweep: bool,
    /// Optional cap on tracked identities per limiter (LRU eviction)
    pub max_tracked_keys: Option<usize>,
    /// Named policy table
    #[serde(default)]
    pub policies: RateLimitPolicies,
    /// Route to policy mapping, longest matching prefix wins
    #[serde(default = "default_routes")]
    pub routes: Vec<RouteRule>,
    /// Policy used when no route matches
    #[serde(default = "default_policy")]
    pub default_policy: PolicyName,
    /// Shared store for the distributed strategy
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_policy() -> PolicyName {
    PolicyName::Api
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: RateLimitStrategy::default(),
            identity: IdentitySource::default(),
            exempt_paths: default_exempt_paths(),
            maintenance_interval_ms: default_maintenance_interval_ms(),
            background_sweep: false,
            max_tracked_keys: None,
            policies: RateLimitPolicies::default(),
            routes: default_routes(),
            default_policy: default_policy(),
            store: StoreConfig::default(),
        }
    }
}

impl RateLimitSettings {
    #[inline]
    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_millis(self.maintenance_interval_ms)
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| path == p || path.starts_with(&format!("{}/", p)))
    }

    /// Policy for a request, chosen by the longest matching route prefix
    pub fn policy_for(&self, method: &str, path: &str) -> PolicyName {
        self.routes
            .iter()
            .filter(|rule| rule.matches(method, path))
            .max_by_key(|rule| rule.prefix.len())
            .map(|rule| rule.policy)
            .unwrap_or(self.default_policy)
    }
}
