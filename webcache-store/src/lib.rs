//! # WEBCACHE Store
//!
//! Backing key-value stores for the WEBCACHE cache-aside layer.
//!
//! - **Memory**: in-process store with per-entry expiry, for development,
//!   tests and single-process deployments
//! - **Redis**: shared store for production (enable the `redis` feature)
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use webcache_store::{KeyValueStore, MemoryStore};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::new();
//! store.set_with_expiry("result:a", "body", Duration::from_secs(10)).await?;
//! assert_eq!(store.increment("count:a").await?, 1);
//! # Ok::<(), webcache_core::WebCacheError>(())
//! # }).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use memory::{MemoryStore, MemoryStoreConfig, StoreStats};
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

// Re-export the trait from core
pub use webcache_core::traits::KeyValueStore;
