//! Common traits for WEBCACHE.
//!
//! These traits are the two seams of the cache-aside layer: the slow operation
//! being fronted, and the store that holds every piece of persisted state.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// FETCHER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// A "fetch result by key" operation.
///
/// Implementations might be:
/// - An HTTP GET where the key is the URL
/// - A closure adapted with `webcache_fetch::from_fn`
/// - Another cached fetcher (wrapping preserves this shape)
///
/// Errors returned here are treated as fetch failures by the caching layer:
/// they are never cached and never retried.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the string result for `key`.
    async fn fetch(&self, key: &str) -> Result<String>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch(&self, key: &str) -> Result<String> {
        (**self).fetch(key).await
    }
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Box<T> {
    async fn fetch(&self, key: &str) -> Result<String> {
        (**self).fetch(key).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY-VALUE STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for the backing key-value store.
///
/// Implementations might use:
/// - In-memory storage (for testing/development)
/// - Redis (for production, shared across processes)
///
/// `increment` and `set_with_expiry` must each be atomic. Entries whose expiry
/// has passed must be invisible to `get` and `exists` even if not yet purged.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the live value at `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` at `key`, replacing any previous value, expiring after `ttl`.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Increments the integer at `key`, creating it at zero first if absent.
    ///
    /// Returns the value after incrementing.
    async fn increment(&self, key: &str) -> Result<u64>;

    /// Returns true if a live value exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool>;
}

#[async_trait]
impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        (**self).set_with_expiry(key, value, ttl).await
    }

    async fn increment(&self, key: &str) -> Result<u64> {
        (**self).increment(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key).await
    }
}
