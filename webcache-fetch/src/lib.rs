//! # WEBCACHE Fetch
//!
//! Cache-aside access layer for slow, unreliable fetches.
//!
//! [`CachedFetcher`] wraps any [`Fetcher`] so that every call:
//!
//! 1. bumps a per-key access counter (`count:{key}`), hit, miss or error
//! 2. returns the cached result (`result:{key}`) while it is live
//! 3. otherwise fetches, caches the body for the TTL, and returns it
//!
//! Failed fetches are never cached and never retried.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use webcache_fetch::{from_fn, FetcherExt};
//! use webcache_store::MemoryStore;
//!
//! # tokio_test::block_on(async {
//! let page = from_fn(|url: String| async move { Ok(format!("<html>{url}</html>")) })
//!     .cached(Arc::new(MemoryStore::new()));
//!
//! page.invoke("http://example.com").await?;
//! page.invoke("http://example.com").await?; // served from cache
//! assert_eq!(page.access_count("http://example.com").await?, 2);
//! # Ok::<(), webcache_core::WebCacheError>(())
//! # }).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod combinator;
mod config;
mod fetcher;

pub use combinator::{from_fn, FetcherExt, FnFetcher};
pub use config::{FetcherConfig, StoreFailurePolicy};
pub use fetcher::{describe_failure, CachedFetcher};

// Re-export the seams from core
pub use webcache_core::traits::{Fetcher, KeyValueStore};
pub use webcache_core::types::FetchResult;
