//! cache_buckets tool implementation.
//!
//! Lists every bucket with its entries, marking the one owned by the running version.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::{CacheController, Network};
use shellcache_core::cache::EntrySummary;

use crate::error::ToolError;

/// Parameters for the cache_buckets tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheBucketsParams {
    /// Include per-entry listings (default: false).
    #[serde(default)]
    pub include_entries: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BucketInfo {
    pub name: String,
    pub current: bool,
    pub entry_count: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<EntrySummary>,
}

/// Output from the cache_buckets tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheBucketsOutput {
    pub state: String,
    pub buckets: Vec<BucketInfo>,
}

/// Implementation of the cache_buckets tool.
pub async fn buckets_impl<N: Network>(
    controller: &CacheController<N>, params: CacheBucketsParams,
) -> Result<CallToolResult, McpError> {
    let db = controller.db();
    let mut buckets = Vec::new();

    for name in db.bucket_names().await? {
        let entry_count = db.entry_count(&name).await?;
        let entries = if params.include_entries { db.entries(&name).await? } else { Vec::new() };
        let current = name == controller.config().bucket_name;
        buckets.push(BucketInfo { name, current, entry_count, entries });
    }

    let output = CacheBucketsOutput { state: controller.state().to_string(), buckets };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| ToolError::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{ready_controller, text_of};

    #[tokio::test]
    async fn test_buckets_lists_current() {
        let c = ready_controller().await;
        c.db().open_bucket("stale").await.unwrap();

        let result = buckets_impl(&c, CacheBucketsParams::default()).await.unwrap();
        let output: CacheBucketsOutput = serde_json::from_str(&text_of(&result)).unwrap();

        assert_eq!(output.state, "activated");
        assert_eq!(output.buckets.len(), 2);
        let current: Vec<_> = output.buckets.iter().filter(|b| b.current).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].name, "test-v1");
    }
}
