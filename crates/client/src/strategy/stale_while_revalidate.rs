use beekon_core::Error;

use super::{Handled, ResponseSource, Revalidation, StrategyContext, Target, unavailable};
use crate::message::Request;

/// Serve whatever is cached right away and refresh it in the background.
///
/// The response returned is always the value read before the refresh
/// started. The refresh runs as a spawned task reachable through
/// [`Handled::revalidation`]. With nothing cached the caller waits for
/// the network like a plain fetch.
pub async fn stale_while_revalidate(ctx: &StrategyContext, request: &Request, target: &Target) -> Result<Handled, Error> {
    if let Some(cached) = ctx.lookup(target).await {
        if cached.fresh {
            ctx.stats.hit();
        } else {
            ctx.stats.stale_hit();
        }
        let revalidation = Revalidation::spawn(ctx.clone(), request.clone(), target.clone());
        let mut handled = Handled::cached(cached.response, cached.fresh);
        handled.revalidation = Some(revalidation);
        return Ok(handled);
    }
    ctx.stats.miss();

    match ctx.network(request).await {
        Ok(response) => {
            ctx.store_response(target, request, &response).await;
            Ok(Handled::new(response, ResponseSource::Network))
        }
        Err(e) if e.is_network() => Err(unavailable(request, &e)),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::strategy::RevalidationOutcome;
    use crate::testing;

    const METRICS: &str = "https://app.beekon.ai/rest/v1/rpc/get_dashboard_metrics";

    #[tokio::test]
    async fn test_returns_previous_value_then_refreshes() {
        let h = testing::harness();
        let request = testing::get(METRICS);
        let target = testing::target("metrics-v1", &request, Duration::from_secs(60));

        h.fetcher.respond(METRICS, 200, r#"{"visibility":1}"#);
        let first = stale_while_revalidate(&h.ctx, &request, &target).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);
        assert!(first.revalidation.is_none());

        h.fetcher.respond(METRICS, 200, r#"{"visibility":2}"#);
        let second = stale_while_revalidate(&h.ctx, &request, &target).await.unwrap();
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.response.body.as_ref(), br#"{"visibility":1}"#);
        let outcome = second.revalidation.unwrap().wait().await;
        assert_eq!(outcome, RevalidationOutcome::Refreshed);

        let third = stale_while_revalidate(&h.ctx, &request, &target).await.unwrap();
        assert_eq!(third.response.body.as_ref(), br#"{"visibility":2}"#);
        third.revalidation.unwrap().wait().await;
        assert_eq!(h.ctx.stats().revalidations, 2);
    }

    #[tokio::test]
    async fn test_stale_entry_served_and_marked() {
        let h = testing::harness();
        let request = testing::get(METRICS);
        let target = testing::target("metrics-v1", &request, Duration::from_secs(60));
        h.fetcher.respond(METRICS, 200, "{}");
        stale_while_revalidate(&h.ctx, &request, &target).await.unwrap();

        h.clock.advance(chrono::Duration::minutes(10));
        h.fetcher.set_offline(true);
        let handled = stale_while_revalidate(&h.ctx, &request, &target).await.unwrap();
        assert_eq!(handled.source, ResponseSource::StaleCache);
        let outcome = handled.revalidation.unwrap().wait().await;
        assert!(matches!(outcome, RevalidationOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_miss_offline_is_unavailable() {
        let h = testing::harness();
        h.fetcher.set_offline(true);
        let request = testing::get(METRICS);
        let target = testing::target("metrics-v1", &request, Duration::from_secs(60));
        let err = stale_while_revalidate(&h.ctx, &request, &target).await.unwrap_err();
        assert!(matches!(err, Error::ResourceUnavailable(_)));
    }
}
