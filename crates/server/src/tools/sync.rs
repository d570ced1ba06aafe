//! sw_sync tool implementation.
//!
//! Replays writes queued while the origin was unreachable.

use beekon_client::CacheWorker;
use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::json_result;

pub async fn sync_impl(worker: &CacheWorker) -> Result<CallToolResult, McpError> {
    let report = worker.sync().await?;
    json_result(&report)
}
