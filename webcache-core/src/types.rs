//! Result metadata returned by the cache-aside layer.

use serde::{Deserialize, Serialize};

/// Outcome of a successful invocation, with where the body came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    /// The fetch key that was invoked
    pub key: String,
    /// The fetched or cached body
    pub body: String,
    /// Whether the body was served from the cache
    pub from_cache: bool,
}

impl FetchResult {
    /// A result served from the cache.
    pub fn cached(key: impl Into<String>, body: String) -> Self {
        Self {
            key: key.into(),
            body,
            from_cache: true,
        }
    }

    /// A result freshly fetched from upstream.
    pub fn fetched(key: impl Into<String>, body: String) -> Self {
        Self {
            key: key.into(),
            body,
            from_cache: false,
        }
    }

    /// Consumes the result, returning just the body.
    pub fn into_body(self) -> String {
        self.body
    }
}
