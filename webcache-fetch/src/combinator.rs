//! Decorating combinators.
//!
//! `fetcher.cached(store)` wraps any [`Fetcher`] in a [`CachedFetcher`], and
//! [`from_fn`] turns a plain async closure into a [`Fetcher`]. Since the
//! cached fetcher is itself a `Fetcher`, wrapping keeps the `key -> String`
//! shape and can be stacked.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use webcache_core::error::Result;
use webcache_core::traits::{Fetcher, KeyValueStore};

use crate::config::FetcherConfig;
use crate::fetcher::CachedFetcher;

/// Adds caching combinators to every [`Fetcher`].
pub trait FetcherExt: Fetcher + Sized {
    /// Wraps `self` with the default configuration (10 second TTL).
    fn cached<S>(self, store: Arc<S>) -> CachedFetcher<Self, S>
    where
        S: KeyValueStore + ?Sized,
    {
        CachedFetcher::new(self, store)
    }

    /// Wraps `self` with a custom configuration.
    fn cached_with<S>(self, store: Arc<S>, config: FetcherConfig) -> Result<CachedFetcher<Self, S>>
    where
        S: KeyValueStore + ?Sized,
    {
        CachedFetcher::with_config(self, store, config)
    }
}

impl<T: Fetcher> FetcherExt for T {}

/// A [`Fetcher`] backed by an async closure. Created by [`from_fn`].
#[derive(Clone)]
pub struct FnFetcher<F> {
    f: F,
}

/// Adapts `Fn(String) -> impl Future<Output = Result<String>>` into a [`Fetcher`].
///
/// ```rust
/// use webcache_fetch::{from_fn, Fetcher};
///
/// let shout = from_fn(|key: String| async move { Ok(key.to_uppercase()) });
/// # tokio_test::block_on(async {
/// assert_eq!(shout.fetch("hi").await.unwrap(), "HI");
/// # });
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnFetcher<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    FnFetcher { f }
}

#[async_trait]
impl<F, Fut> Fetcher for FnFetcher<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    async fn fetch(&self, key: &str) -> Result<String> {
        (self.f)(key.to_string()).await
    }
}

impl<F> std::fmt::Debug for FnFetcher<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFetcher").finish_non_exhaustive()
    }
}
