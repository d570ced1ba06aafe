//! sw_fetch tool implementation.
//!
//! Runs one request through the worker exactly as an intercepted page
//! request would be: classification, strategy, then fallback.

use std::collections::BTreeMap;

use beekon_client::{CacheWorker, HeaderName, HeaderValue, Method, Request, RevalidationOutcome};
use chrono::SecondsFormat;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Path (resolved against the origin) or absolute URL.
    pub url: String,

    /// HTTP method (default: GET). Only GET responses are cached.
    #[serde(default = "default_method")]
    pub method: String,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body for writes.
    #[serde(default)]
    pub body: Option<String>,

    /// Wait for a stale-while-revalidate refresh before returning.
    #[serde(default)]
    pub wait_revalidation: bool,

    /// Truncate the returned body to this many characters (default: 100000).
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

fn default_method() -> String {
    "GET".into()
}

fn default_max_body_chars() -> usize {
    100_000
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    pub url: String,
    pub method: String,
    pub status: u16,
    /// network, cache, stale_cache, fallback or queued.
    pub source: String,
    pub class: String,
    pub partition: String,
    pub strategy: String,
    pub content_type: Option<String>,
    /// Capture time when served from cache.
    pub cached_at: Option<String>,
    pub bytes: usize,
    /// Body text; omitted for binary content.
    pub body: Option<String>,
    pub truncated: bool,
    /// Background refresh state, when one was started.
    pub revalidation: Option<String>,
}

pub async fn fetch_impl(worker: &CacheWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let url = worker.resolve(&params.url)?;
    let method = params
        .method
        .to_ascii_uppercase()
        .parse::<Method>()
        .map_err(|_| ToolError::InvalidMethod(params.method.clone()))?;

    let mut request = Request::new(method, url);
    for (name, value) in &params.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ToolError::InvalidHeader(format!("{name}: {e}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| ToolError::InvalidHeader(format!("{name}: {e}")))?;
        request = request.with_header(name, value);
    }
    if let Some(body) = params.body.clone() {
        request = request.with_body(body);
    }

    let classification = worker.classify(&request.url);
    let partition = worker.partitions().storage_name(classification.partition);
    let url = request.url.to_string();
    let method = request.method.to_string();

    let handled = worker.fetch(request).await?;

    let revalidation = match handled.revalidation {
        Some(revalidation) if params.wait_revalidation => Some(describe(revalidation.wait().await)),
        Some(revalidation) => {
            tracing::debug!(url = %revalidation.url(), "revalidation left running");
            revalidation.detach();
            Some("pending".to_string())
        }
        None => None,
    };

    let response = &handled.response;
    let content_type = response.content_type().map(str::to_string);
    let (body, truncated) = if content_type.as_deref().is_none_or(is_textual) {
        let text = String::from_utf8_lossy(&response.body);
        let truncated = text.chars().count() > params.max_body_chars;
        (Some(text.chars().take(params.max_body_chars).collect()), truncated)
    } else {
        (None, false)
    };

    let output = SwFetchOutput {
        url,
        method,
        status: response.status.as_u16(),
        source: handled.source.as_str().to_string(),
        class: classification.class.as_str().to_string(),
        partition,
        strategy: classification.strategy.as_str().to_string(),
        content_type,
        cached_at: response.cached_at().map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        bytes: response.body.len(),
        body,
        truncated,
        revalidation,
    };

    json_result(&output)
}

fn describe(outcome: RevalidationOutcome) -> String {
    match outcome {
        RevalidationOutcome::Refreshed => "refreshed".to_string(),
        RevalidationOutcome::NotStored { status } => format!("not_stored: HTTP {status}"),
        RevalidationOutcome::Failed(reason) => format!("failed: {reason}"),
    }
}

fn is_textual(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.starts_with("text/") || ct.contains("json") || ct.contains("javascript") || ct.contains("xml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{output, worker};

    fn params(url: &str) -> SwFetchParams {
        SwFetchParams {
            url: url.to_string(),
            method: default_method(),
            headers: BTreeMap::new(),
            body: None,
            wait_revalidation: false,
            max_body_chars: default_max_body_chars(),
        }
    }

    #[tokio::test]
    async fn test_fetch_then_cache_hit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/assets/app.js")
            .with_status(200)
            .with_header("content-type", "text/javascript")
            .with_body("console.log(1)")
            .expect(1)
            .create_async()
            .await;

        let worker = worker(&server.url()).await;
        let first = output(&fetch_impl(&worker, params("/assets/app.js")).await.unwrap());
        assert_eq!(first["source"], "network");
        assert_eq!(first["class"], "static");
        assert_eq!(first["strategy"], "cache_first");

        let second = output(&fetch_impl(&worker, params("/assets/app.js")).await.unwrap());
        assert_eq!(second["source"], "cache");
        assert_eq!(second["body"], "console.log(1)");
        assert!(second["cached_at"].is_string());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_metrics_wait_for_revalidation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/rpc/get_dashboard_metrics")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"visibility":42}"#)
            .create_async()
            .await;

        let worker = worker(&server.url()).await;
        fetch_impl(&worker, params("/rest/v1/rpc/get_dashboard_metrics")).await.unwrap();

        let mut p = params("/rest/v1/rpc/get_dashboard_metrics");
        p.wait_revalidation = true;
        let out = output(&fetch_impl(&worker, p).await.unwrap());
        assert_eq!(out["source"], "cache");
        assert_eq!(out["strategy"], "stale_while_revalidate");
        assert_eq!(out["revalidation"], "refreshed");
    }

    #[tokio::test]
    async fn test_image_offline_placeholder() {
        // Nothing listens on the discard port.
        let worker = worker("http://127.0.0.1:9").await;
        let out = output(&fetch_impl(&worker, params("/img/logo.png")).await.unwrap());
        assert_eq!(out["source"], "fallback");
        assert_eq!(out["status"], 200);
        assert_eq!(out["content_type"], "image/svg+xml");
    }

    #[tokio::test]
    async fn test_offline_write_queued() {
        let worker = worker("http://127.0.0.1:9").await;
        let mut p = params("/rest/v1/brands");
        p.method = "post".to_string();
        p.body = Some(r#"{"name":"acme"}"#.to_string());
        p.headers.insert("content-type".to_string(), "application/json".to_string());

        let out = output(&fetch_impl(&worker, p).await.unwrap());
        assert_eq!(out["source"], "queued");
        assert_eq!(out["status"], 202);
    }

    #[tokio::test]
    async fn test_invalid_header_rejected() {
        let worker = worker("https://app.beekon.ai").await;
        let mut p = params("/");
        p.headers.insert("bad header".to_string(), "x".to_string());
        assert!(fetch_impl(&worker, p).await.is_err());
    }

    #[test]
    fn test_is_textual() {
        assert!(is_textual("text/html; charset=utf-8"));
        assert!(is_textual("application/json"));
        assert!(is_textual("image/svg+xml"));
        assert!(!is_textual("image/png"));
    }
}
