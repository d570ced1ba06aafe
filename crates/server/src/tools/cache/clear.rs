//! cache_clear tool implementation.
//!
//! Clears one partition of the current cache version, or everything.

use beekon_client::{CacheWorker, Partition};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;
use crate::error::ToolError;

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// One of static, api, images, metrics, pages. Omit to clear every partition.
    #[serde(default)]
    pub partition: Option<String>,
}

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

pub async fn clear_impl(worker: &CacheWorker, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    let partition = match params.partition.as_deref() {
        Some(name) => Some(Partition::parse(name).ok_or_else(|| ToolError::UnknownPartition(name.to_string()))?),
        None => None,
    };

    let deleted = worker.clear(partition).await?;
    json_result(&CacheClearOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{output, worker};

    #[tokio::test]
    async fn test_clear_unknown_partition() {
        let worker = worker("https://app.beekon.ai").await;
        let params = CacheClearParams { partition: Some("thumbnails".to_string()) };
        assert!(clear_impl(&worker, params).await.is_err());
    }

    #[tokio::test]
    async fn test_clear_partition() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/rest/v1/brands").with_status(200).with_body("[]").create_async().await;
        server.mock("GET", "/assets/app.js").with_status(200).with_body("js").create_async().await;

        let worker = worker(&server.url()).await;
        for path in ["/rest/v1/brands", "/assets/app.js"] {
            let request = beekon_client::Request::get(worker.resolve(path).unwrap());
            worker.fetch(request).await.unwrap();
        }

        let out = output(&clear_impl(&worker, CacheClearParams { partition: Some("api".into()) }).await.unwrap());
        assert_eq!(out["deleted"], 1);

        let out = output(&clear_impl(&worker, CacheClearParams { partition: None }).await.unwrap());
        assert_eq!(out["deleted"], 1);
    }
}
