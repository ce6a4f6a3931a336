//! Process configuration: env (and `.env`) first, command-line flags on top.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use webcache_core::constants::{DEFAULT_HTTP_TIMEOUT_SECONDS, DEFAULT_TTL_SECONDS};
use webcache_core::traits::KeyValueStore;
use webcache_fetch::{FetcherConfig, StoreFailurePolicy};
use webcache_http::HttpConfig;
use webcache_store::{MemoryStore, RedisStore};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub redis_url: Option<String>,
    pub ttl_seconds: u64,
    pub namespace: Option<String>,
    pub http_timeout_seconds: u64,
    pub store_policy: StoreFailurePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            namespace: None,
            http_timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            store_policy: StoreFailurePolicy::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`; unset or blank values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            redis_url: get("REDIS_URL"),
            ttl_seconds: match get("WEBCACHE_TTL_SECONDS") {
                Some(v) => v
                    .trim()
                    .parse()
                    .with_context(|| format!("WEBCACHE_TTL_SECONDS is not a number: {}", v))?,
                None => defaults.ttl_seconds,
            },
            namespace: get("WEBCACHE_NAMESPACE"),
            http_timeout_seconds: match get("WEBCACHE_HTTP_TIMEOUT") {
                Some(v) => v
                    .trim()
                    .parse()
                    .with_context(|| format!("WEBCACHE_HTTP_TIMEOUT is not a number: {}", v))?,
                None => defaults.http_timeout_seconds,
            },
            store_policy: match get("WEBCACHE_STORE_POLICY") {
                Some(v) => v.parse()?,
                None => defaults.store_policy,
            },
        })
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        let config = FetcherConfig::default()
            .with_ttl(self.ttl_seconds)
            .with_store_failure_policy(self.store_policy);
        match &self.namespace {
            Some(ns) => config.with_namespace(ns.clone()),
            None => config,
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig::default().with_timeout(self.http_timeout_seconds)
    }

    /// Connects the shared store: Redis when a URL is configured, otherwise in-process memory.
    pub async fn connect_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        match &self.redis_url {
            Some(url) => {
                let store = RedisStore::connect(url)
                    .await
                    .with_context(|| format!("Failed to connect to Redis at {}", url))?;
                Ok(Arc::new(store))
            }
            None => {
                info!("No REDIS_URL set, using in-memory store");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }
}
