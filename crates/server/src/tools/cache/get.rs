//! cache_get tool implementation.
//!
//! Shows what the cache holds for a URL without touching the network.

use beekon_client::CacheWorker;
use chrono::SecondsFormat;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Path (resolved against the origin) or absolute URL.
    pub url: String,

    /// Include the cached body as text.
    #[serde(default)]
    pub include_body: bool,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub class: String,
    pub partition: String,
    pub strategy: String,
    pub cached: bool,
    /// Within the partition TTL.
    pub fresh: bool,
    pub cached_at: Option<String>,
    pub status: Option<u16>,
    pub bytes: Option<usize>,
    pub content_type: Option<String>,
    pub body: Option<String>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &CacheWorker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let lookup = worker.lookup(&params.url).await?;
    let entry = lookup.entry.as_ref();

    let output = CacheGetOutput {
        url: lookup.url.to_string(),
        class: lookup.classification.class.as_str().to_string(),
        partition: lookup.partition.clone(),
        strategy: lookup.classification.strategy.as_str().to_string(),
        cached: entry.is_some(),
        fresh: lookup.fresh,
        cached_at: entry.map(|e| e.cached_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        status: entry.map(|e| e.status),
        bytes: entry.map(|e| e.size()),
        content_type: entry.and_then(|e| {
            e.headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
                .map(|(_, value)| value.clone())
        }),
        body: entry
            .filter(|_| params.include_body)
            .map(|e| String::from_utf8_lossy(&e.body).into_owned()),
    };

    json_result(&output)
}
