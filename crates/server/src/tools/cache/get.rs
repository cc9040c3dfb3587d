//! cache_get tool implementation.
//!
//! Retrieves the entry stored for a URL in the current bucket.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::fetch::resolve;
use shellcache_client::{CacheController, Network};
use shellcache_core::Error;
use shellcache_core::cache::hash::compute_cache_key;

use crate::error::ToolError;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL or origin-relative path of the cached request.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub bucket: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub stored_at: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl<N: Network>(
    controller: &CacheController<N>, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let url = resolve(&controller.config().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let bucket = &controller.config().bucket_name;

    let stored = controller
        .db()
        .match_entry(bucket, &compute_cache_key("GET", url.as_str()))
        .await?
        .ok_or_else(|| Error::CacheMiss(url.to_string()))?;

    let output = CacheGetOutput {
        bucket: bucket.clone(),
        url: url.to_string(),
        status: stored.status,
        headers: stored.headers,
        body: String::from_utf8_lossy(&stored.body).to_string(),
        stored_at: stored.stored_at,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| ToolError::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
