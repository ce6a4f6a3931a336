//! Redis-backed key-value store.
//!
//! Shares one auto-reconnecting connection across all callers. Expiry is
//! delegated to Redis (`PSETEX`), and `INCR` gives atomic counters.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{info, instrument};

use webcache_core::error::{Result, WebCacheError};
use webcache_core::traits::KeyValueStore;

/// Redis key-value store.
///
/// Cloning is cheap; clones share the underlying connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects to Redis at `url` (e.g. `redis://127.0.0.1:6379/0`).
    #[instrument]
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| WebCacheError::ConfigError(format!("invalid Redis URL '{}': {}", url, e)))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| WebCacheError::store("connect", e))?;
        info!(url, "Connected to Redis");
        Ok(Self { conn })
    }

    /// Wraps an already established connection manager.
    pub fn from_manager(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| WebCacheError::store("get", e))
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        // PSETEX rejects a zero expiry
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut conn = self.conn.clone();
        conn.pset_ex::<_, _, ()>(key, value, millis)
            .await
            .map_err(|e| WebCacheError::store("set_with_expiry", e))
    }

    async fn increment(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let count: i64 = conn
            .incr(key, 1)
            .await
            .map_err(|e| WebCacheError::store("increment", e))?;
        u64::try_from(count).map_err(|_| WebCacheError::CorruptCounter {
            key: key.to_string(),
            value: count.to_string(),
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.exists(key)
            .await
            .map_err(|e| WebCacheError::store("exists", e))
    }
}
