//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheBucketsParams, CacheGetParams, buckets_impl, get_impl};
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use shellcache_client::{CacheController, FetchClient};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellCacheServer {
    controller: Arc<CacheController<FetchClient>>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShellCacheServer {
    /// Create a new server handler around an activated controller.
    pub fn new(controller: Arc<CacheController<FetchClient>>) -> Self {
        Self { controller, tool_router: Self::tool_router() }
    }

    /// Fetch a URL through the offline cache controller.
    #[tool(
        description = "Fetch a URL through the offline cache controller. Documents and backend API calls always go to the network; other assets fall back to the versioned cache when offline. Returns status, headers, body and where the response came from."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(self.controller.as_ref(), params.0).await
    }

    /// Show a cached entry from the current bucket.
    #[tool(description = "Return the response stored for a URL in the current cache bucket.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(self.controller.as_ref(), params.0).await
    }

    /// List cache buckets.
    #[tool(description = "List cache buckets, their entry counts and which one belongs to the running version.")]
    async fn cache_buckets(&self, params: Parameters<CacheBucketsParams>) -> Result<CallToolResult, McpError> {
        buckets_impl(self.controller.as_ref(), params.0).await
    }
}

impl ServerHandler for ShellCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
