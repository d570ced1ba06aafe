//! cache_sweep tool implementation.

use beekon_client::CacheWorker;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;
use std::collections::BTreeMap;

use super::super::json_result;

#[derive(Debug, Serialize)]
struct CacheSweepOutput {
    removed: BTreeMap<String, u64>,
    total: u64,
}

/// Drop every entry past its partition TTL.
pub async fn sweep_impl(worker: &CacheWorker) -> Result<CallToolResult, McpError> {
    let report = worker.sweep().await?;
    let total = report.total();
    json_result(&CacheSweepOutput { removed: report.removed, total })
}
