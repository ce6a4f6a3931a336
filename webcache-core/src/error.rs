//! Error types for WEBCACHE.
//!
//! Upstream failures live in [`FetchError`]; everything the cache layer itself
//! can run into is a [`WebCacheError`]. A failed fetch is an expected outcome,
//! so both are plain values that callers branch on.

use thiserror::Error;

/// Result type alias using `WebCacheError`.
pub type Result<T> = std::result::Result<T, WebCacheError>;

/// Failure of the wrapped fetch operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never produced a response (DNS, connect, reset, body read).
    #[error("request to '{key}' failed: {reason}")]
    Transport { key: String, reason: String },

    /// The upstream answered with a non-success status.
    #[error("'{key}' returned HTTP {status}")]
    Status { key: String, status: u16 },

    /// The request exceeded the transport timeout.
    #[error("request to '{key}' timed out after {seconds}s")]
    Timeout { key: String, seconds: u64 },

    /// The key cannot be fetched at all (empty, not a URL, bad scheme).
    #[error("invalid fetch key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },
}

impl FetchError {
    /// Builds a transport error from anything displayable.
    pub fn transport(key: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::Transport {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns the key the failed fetch was for.
    pub fn key(&self) -> &str {
        match self {
            FetchError::Transport { key, .. }
            | FetchError::Status { key, .. }
            | FetchError::Timeout { key, .. }
            | FetchError::InvalidKey { key, .. } => key,
        }
    }
}

/// Main error type for all WEBCACHE operations.
#[derive(Debug, Error)]
pub enum WebCacheError {
    // ═══════════════════════════════════════════════════════════════════════════
    // FETCH ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The wrapped fetch failed. Nothing was cached.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The backing key-value store could not serve an operation.
    #[error("store unavailable during {operation}: {reason}")]
    StoreUnavailable { operation: String, reason: String },

    /// A counter key holds something that is not a non-negative integer.
    #[error("counter at '{key}' is not a non-negative integer: {value}")]
    CorruptCounter { key: String, value: String },

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input validation failed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WebCacheError {
    /// Builds a store error for the named operation.
    pub fn store(operation: impl Into<String>, reason: impl ToString) -> Self {
        WebCacheError::StoreUnavailable {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if calling again may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            WebCacheError::Fetch(err) => matches!(
                err,
                FetchError::Transport { .. } | FetchError::Timeout { .. } | FetchError::Status { .. }
            ),
            WebCacheError::StoreUnavailable { .. } => true,
            _ => false,
        }
    }

    /// Returns true if this error came from the wrapped fetch.
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, WebCacheError::Fetch(_))
    }

    /// Returns true if this error came from the backing store.
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            WebCacheError::StoreUnavailable { .. } | WebCacheError::CorruptCounter { .. }
        )
    }
}
