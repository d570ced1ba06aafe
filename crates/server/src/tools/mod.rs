//! MCP tool implementations.
//!
//! This module contains all tools exposed by the beekon-sw server. Each tool
//! takes the shared [`CacheWorker`](beekon_client::CacheWorker) and returns
//! pretty-printed JSON text content.

pub mod cache;
pub mod fetch;
pub mod sync;

pub use cache::{CacheClearParams, CacheGetParams, clear_impl, get_impl, stats_impl, sweep_impl};
pub use fetch::{SwFetchParams, fetch_impl};
pub use sync::sync_impl;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::SerializeFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
