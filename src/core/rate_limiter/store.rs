//! Shared window stores for the distributed limiter

use super::types::deadline;
use crate::utils::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Fixed window state as persisted in a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredWindow {
    pub count: u32,
    /// Exclusive end of the window, unix milliseconds
    pub reset_at_ms: i64,
}

/// Key-value store holding one fixed window per key
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Backend name for logs and health output
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<StoredWindow>>;

    /// Write `window`, expiring the key after `ttl`
    async fn put(&self, key: &str, window: &StoredWindow, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Atomically count one request against `key`, starting a window of
    /// `window_ms` when none is live. Stores without an atomic primitive
    /// return `Ok(None)` and the caller falls back to read-modify-write.
    async fn increment(
        &self,
        _key: &str,
        _window_ms: u64,
        _now_ms: i64,
    ) -> Result<Option<StoredWindow>> {
        Ok(None)
    }

    /// Connectivity check
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    /// Remove expired keys for stores that do not expire them on their own
    async fn sweep(&self) -> usize {
        0
    }
}

struct MemoryEntry {
    window: StoredWindow,
    expires_at: Instant,
}

/// In-process store with per-key expiry
///
/// Offers no atomic increment, so a limiter on top of it uses the
/// read-modify-write path. Two concurrent requests for one key can both
/// read the same count and one increment is lost.
#[derive(Default)]
pub struct MemoryWindowStore {
    windows: DashMap<String, MemoryEntry>,
}

impl MemoryWindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[async_trait]
impl WindowStore for MemoryWindowStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<StoredWindow>> {
        let now = Instant::now();
        if let Some(entry) = self.windows.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.window));
            }
        }
        self.windows.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn put(&self, key: &str, window: &StoredWindow, ttl: Duration) -> Result<()> {
        self.windows.insert(
            key.to_string(),
            MemoryEntry {
                window: *window,
                expires_at: deadline(Instant::now(), ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.windows.remove(key);
        Ok(())
    }

    async fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.windows.len())
    }
}

#[cfg(feature = "redis")]
pub use self::redis_store::RedisWindowStore;

#[cfg(feature = "redis")]
mod redis_store {
    use super::{StoredWindow, WindowStore};
    use crate::utils::error::Result;
    use async_trait::async_trait;
    use redis::{Client, Script, aio::MultiplexedConnection};
    use std::time::Duration;
    use tracing::{debug, info};

    /// INCR the counter, arm the expiry on the first hit of a window, and
    /// report the remaining lifetime.
    const INCREMENT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 or redis.call('PTTL', KEYS[1]) < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return {count, redis.call('PTTL', KEYS[1])}
";

    /// Redis backed store. Each key holds the window count as an integer
    /// with the key TTL marking the end of the window.
    pub struct RedisWindowStore {
        connection: MultiplexedConnection,
        script: Script,
    }

    impl RedisWindowStore {
        /// Connect to the Redis server at `url`
        pub async fn connect(url: &str) -> Result<Self> {
            info!("Connecting rate limit store to Redis");
            debug!("Redis URL: {}", sanitize_url(url));

            let client = Client::open(url)?;
            let connection = client.get_multiplexed_async_connection().await?;

            Ok(Self {
                connection,
                script: Script::new(INCREMENT_SCRIPT),
            })
        }
    }

    #[async_trait]
    impl WindowStore for RedisWindowStore {
        fn name(&self) -> &'static str {
            "redis"
        }

        async fn get(&self, key: &str) -> Result<Option<StoredWindow>> {
            let mut conn = self.connection.clone();
            let (count, ttl_ms): (Option<u32>, i64) = redis::pipe()
                .cmd("GET")
                .arg(key)
                .cmd("PTTL")
                .arg(key)
                .query_async(&mut conn)
                .await?;

            Ok(count.filter(|_| ttl_ms > 0).map(|count| StoredWindow {
                count,
                reset_at_ms: chrono::Utc::now().timestamp_millis().saturating_add(ttl_ms),
            }))
        }

        async fn put(&self, key: &str, window: &StoredWindow, ttl: Duration) -> Result<()> {
            let mut conn = self.connection.clone();
            let ttl_ms = (ttl.as_millis() as u64).max(1);
            let _: () = redis::cmd("SET")
                .arg(key)
                .arg(window.count)
                .arg("PX")
                .arg(ttl_ms)
                .query_async(&mut conn)
                .await?;
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            let mut conn = self.connection.clone();
            let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            Ok(())
        }

        async fn increment(
            &self,
            key: &str,
            window_ms: u64,
            now_ms: i64,
        ) -> Result<Option<StoredWindow>> {
            let mut conn = self.connection.clone();
            let (count, ttl_ms): (u32, i64) = self
                .script
                .key(key)
                .arg(window_ms)
                .invoke_async(&mut conn)
                .await?;

            Ok(Some(StoredWindow {
                count,
                reset_at_ms: now_ms.saturating_add(ttl_ms.max(0)),
            }))
        }

        async fn ping(&self) -> Result<()> {
            let mut conn = self.connection.clone();
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        }
    }

    /// Hide credentials before a URL reaches the logs
    fn sanitize_url(url: &str) -> String {
        match url::Url::parse(url) {
            Ok(mut parsed) => {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("***"));
                }
                parsed.to_string()
            }
            Err(_) => "<invalid url>".to_string(),
        }
    }
}
