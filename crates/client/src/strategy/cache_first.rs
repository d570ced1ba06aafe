use beekon_core::Error;

use super::{Handled, ResponseSource, StrategyContext, Target, unavailable};
use crate::message::Request;

/// Serve from cache while fresh; otherwise fetch and store.
///
/// When the network fails an expired entry is still served. Only when
/// there is nothing cached at all does this return
/// [`Error::ResourceUnavailable`].
pub async fn cache_first(ctx: &StrategyContext, request: &Request, target: &Target) -> Result<Handled, Error> {
    let cached = ctx.lookup(target).await;
    if let Some(hit) = &cached
        && hit.fresh
    {
        ctx.stats.hit();
        tracing::debug!(url = %request.url, partition = %target.partition, "cache hit");
        return Ok(Handled::cached(hit.response.clone(), true));
    }
    ctx.stats.miss();

    match ctx.network(request).await {
        Ok(response) => {
            ctx.store_response(target, request, &response).await;
            Ok(Handled::new(response, ResponseSource::Network))
        }
        Err(e) if e.is_network() => match cached {
            Some(stale) => {
                ctx.stats.stale_hit();
                tracing::info!(url = %request.url, partition = %target.partition, "network failed; serving stale entry");
                Ok(Handled::cached(stale.response, false))
            }
            None => Err(unavailable(request, &e)),
        },
        Err(e) => Err(e),
    }
}
