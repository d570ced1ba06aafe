//! Replay of writes queued while offline.

use beekon_core::cache::QueuedRequest;
use beekon_core::{Error, SyncQueue};
use serde::{Deserialize, Serialize};

use crate::fetch::Fetcher;
use crate::message::Request;

/// Writes replayed per pass.
const BATCH: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Accepted by the origin (2xx).
    pub replayed: u32,
    /// Refused by the origin (4xx); removed, never retried.
    pub rejected: u32,
    /// Left in the queue for the next pass.
    pub failed: u32,
    /// Removed after too many attempts or because they could not be decoded.
    pub dropped: u32,
    pub remaining: u64,
}

/// Replay queued writes oldest first.
///
/// A network failure stops the pass: later writes would fail the same way
/// and replaying them out of order is worse than waiting.
pub async fn replay(queue: &dyn SyncQueue, fetcher: &dyn Fetcher, max_attempts: u32) -> Result<SyncReport, Error> {
    let mut report = SyncReport::default();

    for queued in queue.pending(BATCH).await? {
        if queued.attempts >= max_attempts {
            tracing::warn!(id = queued.id, url = %queued.write.url, attempts = queued.attempts, "dropping queued write");
            queue.remove(queued.id).await?;
            report.dropped += 1;
            continue;
        }

        let request = match Request::from_pending_write(&queued.write) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(id = queued.id, error = %e, "dropping undecodable queued write");
                queue.remove(queued.id).await?;
                report.dropped += 1;
                continue;
            }
        };

        if !replay_one(queue, fetcher, &queued, &request, &mut report).await? {
            break;
        }
    }

    report.remaining = queue.len().await?;
    tracing::info!(
        replayed = report.replayed,
        rejected = report.rejected,
        failed = report.failed,
        dropped = report.dropped,
        remaining = report.remaining,
        "sync pass finished"
    );
    Ok(report)
}

/// Returns false when the pass should stop.
async fn replay_one(
    queue: &dyn SyncQueue, fetcher: &dyn Fetcher, queued: &QueuedRequest, request: &Request, report: &mut SyncReport,
) -> Result<bool, Error> {
    match fetcher.fetch(request).await {
        Ok(response) if response.is_success() => {
            queue.remove(queued.id).await?;
            report.replayed += 1;
            tracing::debug!(id = queued.id, url = %request.url, "replayed queued write");
        }
        Ok(response) if response.status.is_client_error() => {
            queue.remove(queued.id).await?;
            report.rejected += 1;
            tracing::warn!(id = queued.id, url = %request.url, status = response.status.as_u16(), "queued write rejected");
        }
        Ok(response) => {
            queue.record_failure(queued.id, &format!("HTTP {}", response.status.as_u16())).await?;
            report.failed += 1;
        }
        Err(e) if e.is_network() => {
            queue.record_failure(queued.id, &e.to_string()).await?;
            report.failed += 1;
            return Ok(false);
        }
        Err(e) => {
            queue.record_failure(queued.id, &e.to_string()).await?;
            report.failed += 1;
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use beekon_core::{MemoryStore, PendingWrite};
    use chrono::Utc;

    use super::*;
    use crate::testing::ScriptedFetcher;

    fn write(url: &str) -> PendingWrite {
        PendingWrite {
            method: "POST".into(),
            url: url.into(),
            headers: vec![("content-type".into(), "application/json".into())],
            body: Some(br#"{"name":"acme"}"#.to_vec()),
        }
    }

    #[tokio::test]
    async fn test_replay_outcomes() {
        let queue = MemoryStore::new();
        let fetcher = ScriptedFetcher::new();
        fetcher.respond("https://app.beekon.ai/rest/v1/brands", 201, "");
        fetcher.respond("https://app.beekon.ai/rest/v1/flaky", 502, "");
        fetcher.respond("https://app.beekon.ai/rest/v1/invalid", 422, "");

        for url in ["brands", "flaky", "invalid"] {
            queue.enqueue(&write(&format!("https://app.beekon.ai/rest/v1/{url}")), Utc::now()).await.unwrap();
        }

        let report = replay(&queue, fetcher.as_ref(), 5).await.unwrap();
        assert_eq!(report.replayed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.remaining, 1);

        let left = queue.pending(10).await.unwrap();
        assert_eq!(left[0].write.url, "https://app.beekon.ai/rest/v1/flaky");
        assert_eq!(left[0].attempts, 1);
        assert_eq!(left[0].last_error.as_deref(), Some("HTTP 502"));
    }

    #[tokio::test]
    async fn test_network_failure_stops_pass() {
        let queue = MemoryStore::new();
        let fetcher = ScriptedFetcher::new();
        fetcher.set_offline(true);
        queue.enqueue(&write("https://app.beekon.ai/rest/v1/a"), Utc::now()).await.unwrap();
        queue.enqueue(&write("https://app.beekon.ai/rest/v1/b"), Utc::now()).await.unwrap();

        let report = replay(&queue, fetcher.as_ref(), 5).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.remaining, 2);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_writes_dropped() {
        let queue = MemoryStore::new();
        let fetcher = ScriptedFetcher::new();
        let id = queue.enqueue(&write("https://app.beekon.ai/rest/v1/a"), Utc::now()).await.unwrap();
        queue.record_failure(id, "HTTP 503").await.unwrap();
        queue.record_failure(id, "HTTP 503").await.unwrap();

        let report = replay(&queue, fetcher.as_ref(), 2).await.unwrap();
        assert_eq!(report.dropped, 1);
        assert_eq!(report.remaining, 0);
        assert_eq!(fetcher.calls(), 0);
    }
}
