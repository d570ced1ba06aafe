//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use beekon_client::CacheWorker;
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

use crate::tools::{
    CacheClearParams, CacheGetParams, SwFetchParams, clear_impl, fetch_impl, get_impl, stats_impl, sweep_impl,
    sync_impl,
};

/// The main MCP server handler for beekon-sw.
#[derive(Clone)]
pub struct CacheServer {
    worker: Arc<CacheWorker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CacheServer {
    /// Create a new server handler around a running worker.
    pub fn new(worker: Arc<CacheWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    /// Serve a request through the offline cache.
    ///
    /// Classifies the URL, applies its caching strategy and falls back to a
    /// placeholder, error body or offline page when nothing can be served.
    #[tool(
        description = "Fetch a URL through the offline cache. Applies cache-first, network-first or stale-while-revalidate by resource class and reports where the response came from."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Inspect the cached entry for a URL without using the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.worker, params.0).await
    }

    #[tool(description = "Clear one cache partition (static, api, images, metrics, pages) or the whole cache.")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        clear_impl(&self.worker, params.0).await
    }

    #[tool(description = "Remove cached entries older than their partition TTL.")]
    async fn cache_sweep(&self) -> Result<CallToolResult, McpError> {
        sweep_impl(&self.worker).await
    }

    #[tool(description = "Replay writes queued while the origin was unreachable.")]
    async fn sw_sync(&self) -> Result<CallToolResult, McpError> {
        sync_impl(&self.worker).await
    }

    #[tool(description = "Report cache hit/miss counters, entries per partition and queued writes.")]
    async fn cache_stats(&self) -> Result<CallToolResult, McpError> {
        stats_impl(&self.worker).await
    }
}

impl ServerHandler for CacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "beekon-sw".into(),
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
