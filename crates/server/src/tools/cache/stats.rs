//! cache_stats tool implementation.

use beekon_client::CacheWorker;
use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::super::json_result;

pub async fn stats_impl(worker: &CacheWorker) -> Result<CallToolResult, McpError> {
    let stats = worker.stats().await?;
    json_result(&stats)
}
