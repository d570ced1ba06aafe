use beekon_core::Error;

use super::{Handled, ResponseSource, StrategyContext, Target, unavailable};
use crate::message::Request;

/// Always try the network; fall back to the cache only within TTL.
///
/// A response past its TTL is never served, even when the network is down.
pub async fn network_first(ctx: &StrategyContext, request: &Request, target: &Target) -> Result<Handled, Error> {
    let err = match ctx.network(request).await {
        Ok(response) => {
            ctx.store_response(target, request, &response).await;
            return Ok(Handled::new(response, ResponseSource::Network));
        }
        Err(e) if e.is_network() => e,
        Err(e) => return Err(e),
    };

    match ctx.lookup(target).await {
        Some(hit) if hit.fresh => {
            ctx.stats.hit();
            tracing::info!(url = %request.url, partition = %target.partition, "network failed; serving cached entry");
            Ok(Handled::cached(hit.response, true))
        }
        Some(_) => {
            ctx.stats.miss();
            tracing::info!(url = %request.url, partition = %target.partition, "network failed; cached entry expired");
            Err(unavailable(request, &err))
        }
        None => {
            ctx.stats.miss();
            Err(unavailable(request, &err))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing;

    const BRANDS: &str = "https://app.beekon.ai/rest/v1/brands?select=*";

    #[tokio::test]
    async fn test_success_overwrites_cache() {
        let h = testing::harness();
        let request = testing::get(BRANDS);
        let target = testing::target("api-v1", &request, Duration::from_secs(300));

        h.fetcher.respond(BRANDS, 200, r#"[{"id":1}]"#);
        network_first(&h.ctx, &request, &target).await.unwrap();
        h.fetcher.respond(BRANDS, 200, r#"[{"id":2}]"#);
        let handled = network_first(&h.ctx, &request, &target).await.unwrap();
        assert_eq!(handled.source, ResponseSource::Network);

        h.fetcher.set_offline(true);
        let handled = network_first(&h.ctx, &request, &target).await.unwrap();
        assert_eq!(handled.source, ResponseSource::Cache);
        assert_eq!(handled.response.body.as_ref(), br#"[{"id":2}]"#);
        assert_eq!(testing::stored(&h.store, "api-v1").await, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_not_served_offline() {
        let h = testing::harness();
        let request = testing::get(BRANDS);
        let target = testing::target("api-v1", &request, Duration::from_secs(300));
        h.fetcher.respond(BRANDS, 200, "[]");
        network_first(&h.ctx, &request, &target).await.unwrap();

        h.fetcher.set_offline(true);
        h.clock.advance(chrono::Duration::minutes(6));
        let err = network_first(&h.ctx, &request, &target).await.unwrap_err();
        assert!(matches!(err, Error::ResourceUnavailable(_)));
        assert_eq!(h.ctx.stats().network_failures, 1);
    }

    #[tokio::test]
    async fn test_server_error_passed_through() {
        let h = testing::harness();
        let request = testing::get(BRANDS);
        let target = testing::target("api-v1", &request, Duration::from_secs(300));
        h.fetcher.respond(BRANDS, 200, "[]");
        network_first(&h.ctx, &request, &target).await.unwrap();

        h.fetcher.respond(BRANDS, 500, "boom");
        let handled = network_first(&h.ctx, &request, &target).await.unwrap();
        assert_eq!(handled.response.status.as_u16(), 500);
        assert_eq!(handled.source, ResponseSource::Network);

        // The previous success is still cached.
        h.fetcher.set_offline(true);
        let handled = network_first(&h.ctx, &request, &target).await.unwrap();
        assert_eq!(handled.response.body.as_ref(), b"[]");
    }
}
