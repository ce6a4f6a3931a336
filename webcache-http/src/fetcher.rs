//! HTTP fetcher implementation.
//!
//! One shared `reqwest` client with a per-request timeout. Any non-success
//! status is a fetch failure, so error pages never end up in the cache.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use webcache_core::constants::DEFAULT_HTTP_TIMEOUT_SECONDS;
use webcache_core::error::{FetchError, Result, WebCacheError};
use webcache_core::traits::Fetcher;

/// HTTP fetcher configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_HTTP_TIMEOUT_SECONDS,
            user_agent: concat!("webcache/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    /// Sets the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Fetches page bodies over HTTP(S); the fetch key is the URL.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    config: HttpConfig,
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(HttpConfig::default())
    }

    /// Creates a fetcher with the given config.
    pub fn with_config(config: HttpConfig) -> Result<Self> {
        if config.timeout_seconds == 0 {
            return Err(WebCacheError::ConfigError(
                "HTTP timeout must be at least one second".into(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| WebCacheError::ConfigError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// GETs `url` and returns the body text.
    #[instrument(skip(self))]
    pub async fn get_page(&self, url: &str) -> std::result::Result<String, FetchError> {
        let parsed = self.parse_url(url)?;

        let response = self
            .http_client
            .get(parsed)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                key: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(url, e))?;
        debug!(url, status = status.as_u16(), bytes = body.len(), "Fetched page");
        Ok(body)
    }

    pub(crate) fn parse_url(&self, raw: &str) -> std::result::Result<Url, FetchError> {
        let invalid = |reason: String| FetchError::InvalidKey {
            key: raw.to_string(),
            reason,
        };

        if raw.trim().is_empty() {
            return Err(invalid("URL cannot be empty".into()));
        }

        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(invalid(format!("unsupported scheme '{}'", other))),
        }
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                key: url.to_string(),
                seconds: self.config.timeout_seconds,
            }
        } else {
            FetchError::transport(url, err)
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, key: &str) -> Result<String> {
        Ok(self.get_page(key).await?)
    }
}
