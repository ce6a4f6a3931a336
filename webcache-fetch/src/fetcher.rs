//! Cache-aside fetcher with per-key access counting.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use webcache_core::error::{Result, WebCacheError};
use webcache_core::traits::{Fetcher, KeyValueStore};
use webcache_core::types::FetchResult;

use crate::config::{FetcherConfig, StoreFailurePolicy};

/// Fronts a slow [`Fetcher`] with a TTL cache and counts every call.
///
/// Each invocation:
/// 1. Increments `count:{key}`, whatever the outcome of the call
/// 2. Returns `result:{key}` from the store if it is still live
/// 3. Otherwise fetches, stores the body for the configured TTL and returns it
///
/// Failed fetches are returned to the caller and never cached, so the next
/// call fetches again. Nothing is retried.
///
/// The fetcher keeps no mutable state of its own; everything lives in the
/// shared store, so one instance can serve any number of concurrent callers.
/// Two concurrent misses on the same key may both fetch; the last write wins.
pub struct CachedFetcher<F, S: ?Sized = dyn KeyValueStore> {
    fetcher: F,
    store: Arc<S>,
    config: FetcherConfig,
}

impl<F, S> CachedFetcher<F, S>
where
    F: Fetcher,
    S: KeyValueStore + ?Sized,
{
    /// Wraps `fetcher` with the default configuration.
    pub fn new(fetcher: F, store: Arc<S>) -> Self {
        Self {
            fetcher,
            store,
            config: FetcherConfig::default(),
        }
    }

    /// Wraps `fetcher` with a custom configuration.
    pub fn with_config(fetcher: F, store: Arc<S>, config: FetcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fetcher,
            store,
            config,
        })
    }

    /// Fetches `key` through the cache.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let page = HttpFetcher::new()?.cached(store);
    /// let body = page.invoke("http://google.com").await?;
    /// ```
    pub async fn invoke(&self, key: &str) -> Result<String> {
        self.invoke_detailed(key).await.map(FetchResult::into_body)
    }

    /// Like [`invoke`](Self::invoke), also reporting whether the body came from the cache.
    #[instrument(skip(self))]
    pub async fn invoke_detailed(&self, key: &str) -> Result<FetchResult> {
        if key.is_empty() {
            return Err(WebCacheError::ValidationError(
                "fetch key cannot be empty".into(),
            ));
        }

        let count_key = self.config.keys.count_key(key);
        let result_key = self.config.keys.result_key(key);

        match self.store.increment(&count_key).await {
            Ok(count) => debug!(key, count, "Counted access"),
            Err(err) => self.on_store_error(err)?,
        }

        let cached = match self.store.get(&result_key).await {
            Ok(cached) => cached,
            Err(err) => {
                self.on_store_error(err)?;
                None
            }
        };
        if let Some(body) = cached {
            debug!(key, "Cache hit");
            return Ok(FetchResult::cached(key, body));
        }

        debug!(key, "Cache miss, fetching");

        let body = match self.fetcher.fetch(key).await {
            Ok(body) => body,
            Err(err) => {
                warn!(key, error = %err, "Fetch failed, nothing cached");
                return Err(err);
            }
        };

        match self
            .store
            .set_with_expiry(&result_key, &body, self.config.ttl())
            .await
        {
            Ok(()) => info!(
                key,
                bytes = body.len(),
                ttl_seconds = self.config.ttl_seconds,
                "Fetched and cached"
            ),
            Err(err) => self.on_store_error(err)?,
        }

        Ok(FetchResult::fetched(key, body))
    }

    /// Like [`invoke`](Self::invoke), but never fails: errors come back as a
    /// description of the failure in place of the body.
    pub async fn invoke_or_describe(&self, key: &str) -> String {
        match self.invoke(key).await {
            Ok(body) => body,
            Err(err) => describe_failure(key, &err),
        }
    }

    /// Returns how many times `key` has been invoked.
    pub async fn access_count(&self, key: &str) -> Result<u64> {
        let count_key = self.config.keys.count_key(key);
        match self.store.get(&count_key).await? {
            None => Ok(0),
            Some(raw) => raw
                .parse()
                .map_err(|_| WebCacheError::CorruptCounter {
                    key: count_key,
                    value: raw,
                }),
        }
    }

    /// Returns true if a live cached result exists for `key`.
    pub async fn is_cached(&self, key: &str) -> Result<bool> {
        self.store.exists(&self.config.keys.result_key(key)).await
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Returns the wrapped fetcher.
    pub fn inner(&self) -> &F {
        &self.fetcher
    }

    /// Returns the backing store handle.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Applies the store failure policy to a failed store call.
    fn on_store_error(&self, err: WebCacheError) -> Result<()> {
        match self.config.on_store_failure {
            StoreFailurePolicy::PassThrough => {
                warn!(error = %err, "Store unavailable, bypassing cache");
                Ok(())
            }
            StoreFailurePolicy::FailFast => {
                error!(error = %err, "Store unavailable, aborting call");
                Err(err)
            }
        }
    }
}

#[async_trait]
impl<F, S> Fetcher for CachedFetcher<F, S>
where
    F: Fetcher,
    S: KeyValueStore + ?Sized,
{
    async fn fetch(&self, key: &str) -> Result<String> {
        self.invoke(key).await
    }
}

impl<F, S: ?Sized> std::fmt::Debug for CachedFetcher<F, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedFetcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Formats the string returned in place of a body when an invocation fails.
pub fn describe_failure(key: &str, err: &WebCacheError) -> String {
    format!("Error fetching {}: {}", key, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;
    use proptest::prelude::*;
    use webcache_core::error::FetchError;
    use webcache_store::MemoryStore;

    /// Fetcher whose response can be swapped mid-test; counts calls per run.
    struct ScriptedFetcher {
        calls: AtomicUsize,
        response: Mutex<std::result::Result<String, FetchError>>,
    }

    impl ScriptedFetcher {
        fn returning(body: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Mutex::new(Ok(body.to_string())),
            }
        }

        fn failing(key: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                response: Mutex::new(Err(FetchError::transport(key, "connection refused"))),
            }
        }

        fn respond(&self, response: std::result::Result<&str, FetchError>) {
            *self.response.lock() = response.map(String::from);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, _key: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.lock().clone().map_err(WebCacheError::from)
        }
    }

    /// Memory store whose operations can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_increment: AtomicBool,
        fail_get: AtomicBool,
        fail_set: AtomicBool,
    }

    impl FlakyStore {
        fn down() -> Self {
            let store = Self::default();
            store.fail_increment.store(true, Ordering::SeqCst);
            store.fail_get.store(true, Ordering::SeqCst);
            store.fail_set.store(true, Ordering::SeqCst);
            store
        }

        fn check(flag: &AtomicBool, op: &str) -> Result<()> {
            if flag.load(Ordering::SeqCst) {
                Err(WebCacheError::store(op, "connection refused"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            Self::check(&self.fail_get, "get")?;
            self.inner.get(key).await
        }

        async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
            Self::check(&self.fail_set, "set_with_expiry")?;
            self.inner.set_with_expiry(key, value, ttl).await
        }

        async fn increment(&self, key: &str) -> Result<u64> {
            Self::check(&self.fail_increment, "increment")?;
            self.inner.increment(key).await
        }

        async fn exists(&self, key: &str) -> Result<bool> {
            Self::check(&self.fail_get, "exists")?;
            self.inner.exists(key).await
        }
    }

    type Harness = (
        CachedFetcher<Arc<ScriptedFetcher>, MemoryStore>,
        Arc<ScriptedFetcher>,
        Arc<MemoryStore>,
    );

    fn setup(body: &str) -> Harness {
        let fetcher = Arc::new(ScriptedFetcher::returning(body));
        let store = Arc::new(MemoryStore::new());
        (CachedFetcher::new(fetcher.clone(), store.clone()), fetcher, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_then_expiry_scenarios() {
        let (cached, fetcher, store) = setup("hello");

        // first call fetches and stores
        let first = cached.invoke_detailed("X").await.unwrap();
        assert_eq!(first.body, "hello");
        assert!(!first.from_cache);
        assert_eq!(cached.access_count("X").await.unwrap(), 1);
        assert_eq!(store.get("result:X").await.unwrap().as_deref(), Some("hello"));

        // second call is served from cache
        let second = cached.invoke_detailed("X").await.unwrap();
        assert_eq!(second.body, "hello");
        assert!(second.from_cache);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cached.access_count("X").await.unwrap(), 2);

        // past the TTL the fetch runs again
        fetcher.respond(Ok("world"));
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(!cached.is_cached("X").await.unwrap());

        assert_eq!(cached.invoke("X").await.unwrap(), "world");
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cached.access_count("X").await.unwrap(), 3);
        assert_eq!(store.get("result:X").await.unwrap().as_deref(), Some("world"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_just_before_expiry() {
        let (cached, fetcher, _store) = setup("hello");
        cached.invoke("X").await.unwrap();
        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(cached.invoke("X").await.unwrap(), "hello");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_described() {
        let fetcher = Arc::new(ScriptedFetcher::failing("Y"));
        let store = Arc::new(MemoryStore::new());
        let cached = CachedFetcher::new(fetcher.clone(), store.clone());

        let description = cached.invoke_or_describe("Y").await;
        assert!(description.starts_with("Error fetching Y:"));
        assert!(description.contains("connection refused"));

        assert_eq!(cached.access_count("Y").await.unwrap(), 1);
        assert!(!cached.is_cached("Y").await.unwrap());
        assert!(!store.exists("result:Y").await.unwrap());
    }

    #[tokio::test]
    async fn test_failure_does_not_poison_cache() {
        let fetcher = Arc::new(ScriptedFetcher::failing("Y"));
        let cached = CachedFetcher::new(fetcher.clone(), Arc::new(MemoryStore::new()));

        let err = cached.invoke("Y").await.unwrap_err();
        assert!(err.is_fetch_error());

        fetcher.respond(Ok("recovered"));
        assert_eq!(cached.invoke("Y").await.unwrap(), "recovered");
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cached.access_count("Y").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_status_error_passes_through() {
        let fetcher = Arc::new(ScriptedFetcher::returning("unused"));
        fetcher.respond(Err(FetchError::Status {
            key: "http://down.test".into(),
            status: 502,
        }));
        let cached = CachedFetcher::new(fetcher, Arc::new(MemoryStore::new()));

        let err = cached.invoke("http://down.test").await.unwrap_err();
        assert!(matches!(
            err,
            WebCacheError::Fetch(FetchError::Status { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_key_isolation() {
        let (cached, _fetcher, _store) = setup("body");
        cached.invoke("k1").await.unwrap();
        cached.invoke("k1").await.unwrap();

        assert_eq!(cached.access_count("k1").await.unwrap(), 2);
        assert_eq!(cached.access_count("k2").await.unwrap(), 0);
        assert!(cached.is_cached("k1").await.unwrap());
        assert!(!cached.is_cached("k2").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_key_rejected_without_counting() {
        let (cached, fetcher, store) = setup("body");
        let err = cached.invoke("").await.unwrap_err();
        assert!(matches!(err, WebCacheError::ValidationError(_)));
        assert_eq!(fetcher.calls(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_namespaced_keys() {
        let fetcher = Arc::new(ScriptedFetcher::returning("body"));
        let store = Arc::new(MemoryStore::new());
        let cached = CachedFetcher::with_config(
            fetcher,
            store.clone(),
            FetcherConfig::default().with_namespace("pages"),
        )
        .unwrap();

        cached.invoke("u").await.unwrap();
        assert_eq!(store.get("pages:count:u").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("pages:result:u").await.unwrap().as_deref(), Some("body"));
        assert!(store.get("result:u").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_counter_reported() {
        let (cached, _fetcher, store) = setup("body");
        store
            .set_with_expiry("count:x", "many", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(matches!(
            cached.access_count("x").await,
            Err(WebCacheError::CorruptCounter { .. })
        ));
    }

    #[tokio::test]
    async fn test_store_down_pass_through() {
        let fetcher = Arc::new(ScriptedFetcher::returning("live"));
        let cached = CachedFetcher::new(fetcher.clone(), Arc::new(FlakyStore::down()));

        assert_eq!(cached.invoke("k").await.unwrap(), "live");
        assert_eq!(cached.invoke("k").await.unwrap(), "live");
        // degraded to always fetch, never cache
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_store_down_fail_fast() {
        let fetcher = Arc::new(ScriptedFetcher::returning("live"));
        let cached = CachedFetcher::with_config(
            fetcher.clone(),
            Arc::new(FlakyStore::down()),
            FetcherConfig::default().with_store_failure_policy(StoreFailurePolicy::FailFast),
        )
        .unwrap();

        let err = cached.invoke("k").await.unwrap_err();
        assert!(err.is_store_error());
        assert_eq!(fetcher.calls(), 0);

        let description = cached.invoke_or_describe("k").await;
        assert!(description.starts_with("Error fetching k:"));
    }

    #[tokio::test]
    async fn test_store_write_failure_fail_fast() {
        let store = Arc::new(FlakyStore::default());
        store.fail_set.store(true, Ordering::SeqCst);
        let fetcher = Arc::new(ScriptedFetcher::returning("live"));
        let cached = CachedFetcher::with_config(
            fetcher.clone(),
            store.clone(),
            FetcherConfig::default().with_store_failure_policy(StoreFailurePolicy::FailFast),
        )
        .unwrap();

        assert!(cached.invoke("k").await.unwrap_err().is_store_error());
        // the access was still counted before the write failed
        assert_eq!(cached.access_count("k").await.unwrap(), 1);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_store_write_failure_pass_through() {
        let store = Arc::new(FlakyStore::default());
        store.fail_set.store(true, Ordering::SeqCst);
        let fetcher = Arc::new(ScriptedFetcher::returning("live"));
        let cached = CachedFetcher::new(fetcher.clone(), store.clone());

        assert_eq!(cached.invoke("k").await.unwrap(), "live");
        assert!(!cached.is_cached("k").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_invocations_count_exactly() {
        let (cached, fetcher, _store) = setup("shared");
        let cached = Arc::new(cached);

        let calls = (0..50).map(|_| {
            let cached = cached.clone();
            async move { cached.invoke("hot").await }
        });
        let results = futures::future::join_all(calls).await;

        assert!(results.iter().all(|r| matches!(r, Ok(body) if body == "shared")));
        assert_eq!(cached.access_count("hot").await.unwrap(), 50);
        assert!(fetcher.calls() >= 1);
    }

    #[tokio::test]
    async fn test_counts_stay_exact_when_store_is_full() {
        use webcache_store::MemoryStoreConfig;

        let store = Arc::new(MemoryStore::with_config(MemoryStoreConfig {
            max_entries: 4,
            auto_cleanup: true,
        }));
        let fetcher = Arc::new(ScriptedFetcher::returning("page"));
        let cached = CachedFetcher::new(fetcher.clone(), store.clone());

        let keys = ["a", "b", "c", "d", "e", "f"];
        for key in keys {
            assert_eq!(cached.invoke(key).await.unwrap(), "page");
        }
        for key in keys {
            assert_eq!(cached.access_count(key).await.unwrap(), 1, "count for {key}");
        }

        // counters survive while cached results are capped
        let stats = store.stats();
        assert_eq!(stats.persistent_entries, 6);
        assert_eq!(stats.total_entries - stats.persistent_entries, 4);
        assert!(cached.is_cached("f").await.unwrap());
        assert_eq!(fetcher.calls(), 6);
    }

    #[tokio::test]
    async fn test_invoke_with_real_http_fetcher() {
        use webcache_http::HttpFetcher;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>google</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let cached = CachedFetcher::new(HttpFetcher::new().unwrap(), Arc::new(MemoryStore::new()));
        let url = format!("{}/", server.uri());
        for _ in 0..3 {
            assert_eq!(cached.invoke(&url).await.unwrap(), "<html>google</html>");
        }
        assert_eq!(cached.access_count(&url).await.unwrap(), 3);
    }

    proptest! {
        #[test]
        fn counters_track_every_invocation(ops in prop::collection::vec((0usize..3, any::<bool>()), 0..40)) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let keys = ["a", "b", "c"];
                let fetcher = Arc::new(ScriptedFetcher::returning("v"));
                let cached = CachedFetcher::new(fetcher.clone(), Arc::new(MemoryStore::new()));
                let mut expected = [0u64; 3];

                for (idx, fail) in &ops {
                    if *fail {
                        fetcher.respond(Err(FetchError::transport(keys[*idx], "boom")));
                    } else {
                        fetcher.respond(Ok("v"));
                    }
                    let _ = cached.invoke(keys[*idx]).await;
                    expected[*idx] += 1;
                }

                for (idx, key) in keys.iter().enumerate() {
                    assert_eq!(cached.access_count(key).await.unwrap(), expected[idx]);
                }
            });
        }
    }
}
