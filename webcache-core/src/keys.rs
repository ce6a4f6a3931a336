//! Store key derivation.
//!
//! Every fetch key `k` owns two store keys: `result:{k}` for the cached body
//! and `count:{k}` for the access counter. With a namespace `p` they become
//! `p:result:{k}` and `p:count:{k}`.

use serde::{Deserialize, Serialize};

use crate::constants::{COUNT_FAMILY, KEY_SEPARATOR, RESULT_FAMILY};
use crate::error::{Result, WebCacheError};

/// Derives store keys for the two key families.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpace {
    /// Optional prefix shared by every derived key.
    pub namespace: Option<String>,
}

impl KeySpace {
    /// Creates a key space under the given namespace.
    pub fn namespaced(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
        }
    }

    /// Store key holding the cached result for `key`.
    pub fn result_key(&self, key: &str) -> String {
        self.derive(RESULT_FAMILY, key)
    }

    /// Store key holding the access counter for `key`.
    pub fn count_key(&self, key: &str) -> String {
        self.derive(COUNT_FAMILY, key)
    }

    /// Rejects namespaces that would make derived keys ambiguous.
    pub fn validate(&self) -> Result<()> {
        if let Some(ns) = &self.namespace {
            if ns.is_empty() {
                return Err(WebCacheError::ConfigError("namespace cannot be empty".into()));
            }
            if ns.contains(KEY_SEPARATOR) {
                return Err(WebCacheError::ConfigError(format!(
                    "namespace '{}' must not contain '{}'",
                    ns, KEY_SEPARATOR
                )));
            }
        }
        Ok(())
    }

    fn derive(&self, family: &str, key: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}{KEY_SEPARATOR}{family}{KEY_SEPARATOR}{key}"),
            None => format!("{family}{KEY_SEPARATOR}{key}"),
        }
    }
}
