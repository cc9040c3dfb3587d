//! Responses handed back to the page.

use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use shellcache_core::{Error, StoredResponse};

/// Body of every synthesized offline placeholder for documents and assets.
pub const OFFLINE_BODY: &str = "Offline - content not available";

/// Body of the synthesized API failure.
pub const NETWORK_ERROR_BODY: &str = "Network error";

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    /// Built locally because neither network nor cache could answer.
    Synthesized,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub status_text: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl Response {
    fn service_unavailable(content_type: Option<&'static str>, body: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            status_text: "Service Unavailable".to_string(),
            headers,
            body: Bytes::from_static(body.as_bytes()),
            source: ResponseSource::Synthesized,
        }
    }

    /// Page load failed and no shell document is cached.
    pub fn offline_document() -> Self {
        Self::service_unavailable(Some("text/html"), OFFLINE_BODY)
    }

    /// Backend call failed. Carries no content type.
    pub fn network_error() -> Self {
        Self::service_unavailable(None, NETWORK_ERROR_BODY)
    }

    /// Asset fetch failed and no copy is cached.
    pub fn offline_asset() -> Self {
        Self::service_unavailable(Some("text/plain"), OFFLINE_BODY)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Snapshot for bucket storage. Header values that are not valid UTF-8 are dropped.
    pub fn to_stored(&self) -> StoredResponse {
        StoredResponse {
            status: self.status.as_u16(),
            status_text: self.status_text.clone(),
            headers: self
                .headers
                .iter()
                .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
                .collect(),
            body: self.body.to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Rebuild a response from a bucket entry.
    pub fn from_stored(stored: StoredResponse) -> Result<Self, Error> {
        let status = StatusCode::from_u16(stored.status)
            .map_err(|_| Error::CorruptEntry(format!("invalid status {}", stored.status)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &stored.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::debug!(header = %name, "skipping unparseable cached header"),
            }
        }

        Ok(Self {
            status,
            status_text: stored.status_text,
            headers,
            body: Bytes::from(stored.body),
            source: ResponseSource::Cache,
        })
    }
}

/// Serializable rendering of a [`Response`] for hosts that print or transmit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseView {
    pub status: u16,
    pub status_text: String,
    pub source: ResponseSource,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub body_bytes: usize,
}

impl From<&Response> for ResponseView {
    fn from(response: &Response) -> Self {
        Self {
            status: response.status.as_u16(),
            status_text: response.status_text.clone(),
            source: response.source,
            content_type: response.content_type().map(str::to_string),
            headers: response
                .headers
                .iter()
                .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).to_string()))
                .collect(),
            body: String::from_utf8_lossy(&response.body).to_string(),
            body_bytes: response.body.len(),
        }
    }
}
