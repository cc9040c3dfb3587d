//! sw_fetch tool implementation.
//!
//! Routes one request through the cache controller and returns whatever it
//! answered: a live response, a cached copy, or a synthesized 503.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::fetch::resolve;
use shellcache_client::header::HeaderValue;
use shellcache_client::{
    CacheController, Category, Destination, LifecycleState, Method, Network, RequestDescriptor, ResponseView,
};
use shellcache_core::Error;

use crate::error::ToolError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination hint such as "document", "script", "style" or "image".
    #[serde(default)]
    pub destination: Option<String>,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwFetchOutput {
    pub url: String,
    pub category: Category,
    pub response: ResponseView,
}

/// Build a request descriptor from tool parameters.
pub fn build_request<N: Network>(
    controller: &CacheController<N>, params: &SwFetchParams,
) -> Result<RequestDescriptor, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let url = resolve(&controller.config().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| ToolError::InvalidInput(format!("unsupported method: {}", params.method)))?;

    let mut request = RequestDescriptor::new(method, url);
    if let Some(destination) = &params.destination {
        request = request.with_destination(Destination::from(destination.as_str()));
    }
    if let Some(accept) = &params.accept {
        let value = HeaderValue::from_str(accept).map_err(|e| ToolError::InvalidHeader(format!("accept: {e}")))?;
        request = request.with_accept(value);
    }

    Ok(request)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl<N: Network>(
    controller: &CacheController<N>, params: SwFetchParams,
) -> Result<CallToolResult, McpError> {
    let state = controller.state();
    if state != LifecycleState::Activated {
        return Err(Error::NotReady(state.to_string()).into());
    }

    let request = build_request(controller, &params)?;
    let category = controller.config().classifier.classify(&request);
    let response = controller.on_fetch(&request).await;

    let output = SwFetchOutput { url: request.url.to_string(), category, response: ResponseView::from(&response) };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| ToolError::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
