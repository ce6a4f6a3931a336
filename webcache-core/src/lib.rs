//! # WEBCACHE Core
//!
//! Core types, errors, and traits for the WEBCACHE cache-aside layer.
//!
//! This crate provides the building blocks shared by the other WEBCACHE crates:
//!
//! - **Traits**: [`Fetcher`] (the slow operation being fronted) and
//!   [`KeyValueStore`] (the backing store that owns all state)
//! - **Keys**: the `result:` / `count:` key families derived from a fetch key
//! - **Errors**: [`FetchError`] for upstream failures, [`WebCacheError`] for everything
//! - **Constants**: defaults such as the 10 second result TTL
//!
//! ## Example
//!
//! ```rust
//! use webcache_core::KeySpace;
//!
//! let keys = KeySpace::default();
//! assert_eq!(keys.result_key("http://example.com"), "result:http://example.com");
//! assert_eq!(keys.count_key("http://example.com"), "count:http://example.com");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod keys;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{FetchError, Result, WebCacheError};
pub use keys::KeySpace;
pub use traits::*;
pub use types::*;
