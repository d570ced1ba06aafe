use tokio::task::JoinHandle;
use url::Url;

use super::{StrategyContext, Target};
use crate::message::Request;

/// How a background refresh ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevalidationOutcome {
    /// The entry was replaced with the network response.
    Refreshed,
    /// The network answered but the response was not stored.
    NotStored { status: u16 },
    /// The network failed or the task was cancelled; the entry is untouched.
    Failed(String),
}

/// Handle to a background refresh started by stale-while-revalidate.
///
/// Dropping the handle does not cancel the refresh.
#[derive(Debug)]
pub struct Revalidation {
    url: Url,
    handle: JoinHandle<RevalidationOutcome>,
}

impl Revalidation {
    pub(crate) fn spawn(ctx: StrategyContext, request: Request, target: Target) -> Self {
        let url = request.url.clone();
        let handle = tokio::spawn(async move {
            ctx.stats.revalidation();
            match ctx.network(&request).await {
                Ok(response) => {
                    if ctx.store_response(&target, &request, &response).await {
                        tracing::debug!(url = %request.url, "revalidated");
                        RevalidationOutcome::Refreshed
                    } else {
                        RevalidationOutcome::NotStored { status: response.status.as_u16() }
                    }
                }
                Err(e) => {
                    tracing::debug!(url = %request.url, error = %e, "revalidation failed");
                    RevalidationOutcome::Failed(e.to_string())
                }
            }
        });
        Self { url, handle }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Wait for the refresh to complete.
    pub async fn wait(self) -> RevalidationOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => RevalidationOutcome::Failed(e.to_string()),
        }
    }

    /// Let the refresh finish on its own.
    pub fn detach(self) {
        drop(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn test_not_found_not_stored() {
        let h = testing::harness();
        let request = testing::get("https://app.beekon.ai/rest/v1/rpc/get_gone_metrics");
        let target = testing::target("metrics-v1", &request, Duration::from_secs(60));

        let revalidation = Revalidation::spawn(h.ctx.clone(), request.clone(), target);
        assert_eq!(revalidation.url(), &request.url);
        assert_eq!(revalidation.wait().await, RevalidationOutcome::NotStored { status: 404 });
        assert_eq!(testing::stored(&h.store, "metrics-v1").await, 0);
    }

    #[tokio::test]
    async fn test_detached_refresh_completes() {
        let h = testing::harness();
        let url = "https://app.beekon.ai/rest/v1/rpc/get_dashboard_metrics";
        h.fetcher.respond(url, 200, "{}");
        let request = testing::get(url);
        let target = testing::target("metrics-v1", &request, Duration::from_secs(60));

        Revalidation::spawn(h.ctx.clone(), request, target).detach();
        for _ in 0..100 {
            if testing::stored(&h.store, "metrics-v1").await == 1 {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("detached revalidation never stored the entry");
    }
}
