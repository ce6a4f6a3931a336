//! In-memory key-value store with per-entry expiry.
//!
//! Fast, thread-safe storage suitable for development, testing,
//! and single-process deployments.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, instrument};

use webcache_core::constants::DEFAULT_MEMORY_MAX_ENTRIES;
use webcache_core::error::{Result, WebCacheError};
use webcache_core::traits::KeyValueStore;

/// Stored value with optional expiry.
#[derive(Clone, Debug)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn persistent(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    fn expiring(value: impl Into<String>, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: Some(Instant::now() + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Memory store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// Maximum number of expiring entries; counters are not bounded
    pub max_entries: usize,
    /// Whether to purge expired entries before evicting live ones
    pub auto_cleanup: bool,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MEMORY_MAX_ENTRIES,
            auto_cleanup: true,
        }
    }
}

/// In-memory key-value store.
///
/// Every operation on a single key runs under that key's shard lock, so
/// `increment` never loses updates and `set_with_expiry` replaces atomically.
///
/// # Expiry
///
/// Expired entries are invisible to reads and purged lazily when touched.
/// Incrementing an expired key starts a fresh counter at zero.
///
/// # Capacity
///
/// The bound applies to expiring entries (cached results) only. Counters are
/// always created and never evicted. When a write would exceed the bound,
/// expired entries are purged first, then the live entry closest to expiry is
/// evicted.
///
/// The bound is soft: the check and the insert are not one atomic step, so
/// concurrent writes of distinct keys can briefly overshoot it.
#[derive(Debug)]
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
    config: MemoryStoreConfig,
}

impl MemoryStore {
    /// Creates a new store with default configuration.
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    /// Creates a store with custom configuration.
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Returns the number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes an entry.
    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Clears all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Removes all expired entries, returning how many were purged.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            debug!(purged, "Purged expired entries");
        }
        purged
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        let now = Instant::now();
        let mut stats = StoreStats {
            capacity: self.config.max_entries,
            ..StoreStats::default()
        };
        for entry in self.entries.iter() {
            stats.total_entries += 1;
            match entry.expires_at {
                None => stats.persistent_entries += 1,
                Some(_) if entry.is_expired(now) => stats.expired_entries += 1,
                Some(_) => {}
            }
        }
        stats.live_entries = stats.total_entries - stats.expired_entries;
        stats
    }

    fn expiring_len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.expires_at.is_some())
            .count()
    }

    /// Frees a slot for a new expiring entry if the bound is reached.
    fn make_room(&self, key: &str) -> Result<()> {
        let max = self.config.max_entries;
        if self.entries.len() < max
            || self.entries.contains_key(key)
            || self.expiring_len() < max
        {
            return Ok(());
        }

        if self.config.auto_cleanup {
            self.cleanup_expired();
            if self.expiring_len() < max {
                return Ok(());
            }
        }

        let victim = self
            .entries
            .iter()
            .filter_map(|e| e.expires_at.map(|at| (at, e.key().clone())))
            .min_by_key(|(at, _)| *at)
            .map(|(_, k)| k);

        match victim {
            Some(victim) => {
                debug!(victim, "Evicting entry closest to expiry");
                self.entries.remove(&victim);
                Ok(())
            }
            None => Err(WebCacheError::store(
                "set_with_expiry",
                format!("memory store holds no expiring entries to evict (max {})", max),
            )),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => {}
        }
        self.entries.remove_if(key, |_, e| e.is_expired(now));
        Ok(None)
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.make_room(key)?;
        self.entries
            .insert(key.to_string(), StoredValue::expiring(value, ttl));
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<u64> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::persistent("0"));
        if entry.is_expired(now) {
            *entry = StoredValue::persistent("0");
        }

        let corrupt = || WebCacheError::CorruptCounter {
            key: key.to_string(),
            value: entry.value.clone(),
        };
        let next = entry
            .value
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_add(1))
            .ok_or_else(corrupt)?;

        entry.value = next.to_string();
        Ok(next)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Store statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Entries held, including expired ones not yet purged
    pub total_entries: usize,
    /// Entries visible to reads
    pub live_entries: usize,
    /// Expired entries awaiting purge
    pub expired_entries: usize,
    /// Entries without expiry (counters)
    pub persistent_entries: usize,
    /// Configured bound on expiring entries
    pub capacity: usize,
}
