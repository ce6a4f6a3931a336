//! Cached fetcher configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use webcache_core::constants::DEFAULT_TTL_SECONDS;
use webcache_core::error::{Result, WebCacheError};
use webcache_core::keys::KeySpace;

/// What to do when the backing store fails mid-call.
///
/// Wrapped fetch failures are unaffected; this only covers the store's own
/// `increment`, `get` and `set_with_expiry`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreFailurePolicy {
    /// Log and carry on as if the cache were empty: always fetch, never cache.
    #[default]
    PassThrough,
    /// Abort the call and return the store error.
    FailFast,
}

impl fmt::Display for StoreFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreFailurePolicy::PassThrough => f.write_str("pass-through"),
            StoreFailurePolicy::FailFast => f.write_str("fail-fast"),
        }
    }
}

impl FromStr for StoreFailurePolicy {
    type Err = WebCacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pass-through" | "passthrough" | "degrade" => Ok(StoreFailurePolicy::PassThrough),
            "fail-fast" | "failfast" | "strict" => Ok(StoreFailurePolicy::FailFast),
            other => Err(WebCacheError::ConfigError(format!(
                "unknown store failure policy '{}' (expected pass-through or fail-fast)",
                other
            ))),
        }
    }
}

/// Cached fetcher configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Lifetime of a cached result in whole seconds
    pub ttl_seconds: u64,
    /// Store key derivation
    pub keys: KeySpace,
    /// Behaviour when the store itself fails
    pub on_store_failure: StoreFailurePolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            keys: KeySpace::default(),
            on_store_failure: StoreFailurePolicy::default(),
        }
    }
}

impl FetcherConfig {
    /// Sets the result TTL.
    pub fn with_ttl(mut self, seconds: u64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    /// Prefixes every store key with `namespace`.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.keys = KeySpace::namespaced(namespace);
        self
    }

    /// Sets the store failure policy.
    pub fn with_store_failure_policy(mut self, policy: StoreFailurePolicy) -> Self {
        self.on_store_failure = policy;
        self
    }

    /// Result TTL as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// Checks the configuration for values the store cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.ttl_seconds == 0 {
            return Err(WebCacheError::ConfigError(
                "TTL must be at least one second".into(),
            ));
        }
        self.keys.validate()
    }
}
