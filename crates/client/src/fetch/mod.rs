//! Network access for the cache controller.
//!
//! ### Fetch semantics
//! - Any HTTP status is a response; only transport failures are errors.
//! - Method and headers of the intercepted request are forwarded.
//! - Max redirects: 5
//! - Max body bytes: configurable (default 10MB)
//!
//! ### Timeouts
//! The controller imposes none. The only deadline is the HTTP client's own
//! request timeout.

pub mod url;

use bytes::Bytes;
use reqwest::{Client, header};
use shellcache_core::{AppConfig, Error};
use std::time::{Duration, Instant};

pub use url::{UrlError, resolve};

use crate::request::RequestDescriptor;
use crate::response::{Response, ResponseSource};

/// Error type for failed network requests.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    #[error("request to {0} timed out")]
    Timeout(String),

    #[error("network error: {0}")]
    Transport(String),

    #[error("{size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<NetworkError> for Error {
    fn from(err: NetworkError) -> Self {
        Error::Network(err.to_string())
    }
}

/// Seam between the controller and the network.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Perform the request. Resolves with any HTTP status; fails only when no
    /// usable response arrived.
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Response, NetworkError>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "shellcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shellcache/0.1".to_string(),
            max_bytes: 10 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`Network`] implementation.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn map_send_error(url: &str, err: reqwest::Error) -> NetworkError {
        if err.is_timeout() {
            NetworkError::Timeout(url.to_string())
        } else if err.is_builder() {
            NetworkError::InvalidRequest(err.to_string())
        } else {
            NetworkError::Transport(err.to_string())
        }
    }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<Response, NetworkError> {
        let start = Instant::now();
        let url = request.url.as_str();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| Self::map_send_error(url, e))?;

        let status = response.status();

        if let Some(size) = response.content_length().map(declared_size)
            && size > self.config.max_bytes
        {
            return Err(NetworkError::TooLarge { size, limit: self.config.max_bytes });
        }

        let headers = response.headers().clone();

        let bytes: Bytes = response.bytes().await.map_err(|e| Self::map_send_error(url, e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(NetworkError::TooLarge { size: bytes.len(), limit: self.config.max_bytes });
        }

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes, {})",
            request.method,
            url,
            status.as_u16(),
            fetch_ms,
            bytes.len(),
            headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("no content-type")
        );

        Ok(Response {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: bytes,
            source: ResponseSource::Network,
        })
    }
}

/// Declared `Content-Length`, saturating where `usize` is narrower than 64 bits.
fn declared_size(len: u64) -> usize {
    usize::try_from(len).unwrap_or(usize::MAX)
}
