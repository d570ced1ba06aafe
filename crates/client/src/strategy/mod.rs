//! Strategy executors.
//!
//! Each executor serves one request against one partition. They share a
//! [`StrategyContext`] holding the injected store, fetcher and clock.
//!
//! Executors signal "nothing to serve" with [`Error::ResourceUnavailable`];
//! turning that into a placeholder, an error body or an offline page is the
//! worker's job. Storage failures never fail a request: they are logged and
//! the request continues as if the cache were empty.

mod cache_first;
mod network_first;
mod revalidate;
mod stale_while_revalidate;

use std::sync::Arc;
use std::time::Duration;

use beekon_core::{Clock, Error, PartitionStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use cache_first::cache_first;
pub use network_first::network_first;
pub use revalidate::{Revalidation, RevalidationOutcome};
pub use stale_while_revalidate::stale_while_revalidate;

use crate::fetch::Fetcher;
use crate::message::{Request, Response};
use crate::stats::{AtomicStats, CacheStats};

/// Where a handled response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    /// Cached and within TTL.
    Cache,
    /// Cached and past TTL.
    StaleCache,
    /// Synthetic placeholder, error body or offline page.
    Fallback,
    /// Write accepted into the sync queue.
    Queued,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::StaleCache => "stale_cache",
            ResponseSource::Fallback => "fallback",
            ResponseSource::Queued => "queued",
        }
    }
}

/// A response plus how it was produced.
#[derive(Debug)]
pub struct Handled {
    pub response: Response,
    pub source: ResponseSource,
    /// Background refresh started by stale-while-revalidate.
    pub revalidation: Option<Revalidation>,
}

impl Handled {
    pub fn new(response: Response, source: ResponseSource) -> Self {
        Self { response, source, revalidation: None }
    }

    pub(crate) fn cached(response: Response, fresh: bool) -> Self {
        Self::new(response, if fresh { ResponseSource::Cache } else { ResponseSource::StaleCache })
    }
}

/// Partition slot a request is served from.
#[derive(Debug, Clone)]
pub struct Target {
    /// Storage name, e.g. `api-v1`.
    pub partition: String,
    pub key: String,
    pub ttl: Duration,
}

pub(crate) struct Cached {
    pub response: Response,
    pub fresh: bool,
}

/// Dependencies shared by all executors.
#[derive(Clone)]
pub struct StrategyContext {
    store: Arc<dyn PartitionStore>,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    stats: Arc<AtomicStats>,
    max_entry_bytes: usize,
}

impl StrategyContext {
    pub fn new(store: Arc<dyn PartitionStore>, fetcher: Arc<dyn Fetcher>, clock: Arc<dyn Clock>) -> Self {
        Self { store, fetcher, clock, stats: Arc::new(AtomicStats::default()), max_entry_bytes: 10 * 1024 * 1024 }
    }

    /// Larger responses are served but not stored.
    pub fn with_max_entry_bytes(mut self, max_entry_bytes: usize) -> Self {
        self.max_entry_bytes = max_entry_bytes;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn PartitionStore> {
        &self.store
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub(crate) fn counters(&self) -> &AtomicStats {
        &self.stats
    }

    /// Read an entry. Unreadable entries and store failures count as a miss.
    pub(crate) async fn lookup(&self, target: &Target) -> Option<Cached> {
        let entry = match self.store.get(&target.partition, &target.key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                self.stats.store_error();
                tracing::warn!(partition = %target.partition, error = %e, "cache read failed; continuing without cache");
                return None;
            }
        };

        let fresh = entry.is_fresh(target.ttl, self.now());
        match Response::from_entry(&entry) {
            Ok(response) => Some(Cached { response, fresh }),
            Err(e) => {
                self.stats.store_error();
                tracing::warn!(partition = %target.partition, url = %entry.url, error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    pub(crate) async fn network(&self, request: &Request) -> Result<Response, Error> {
        self.stats.network_fetch();
        let result = self.fetcher.fetch(request).await;
        if let Err(e) = &result
            && e.is_network()
        {
            self.stats.network_failure();
            tracing::debug!(url = %request.url, error = %e, "network fetch failed");
        }
        result
    }

    /// Store a successful response. Returns whether it was written.
    pub(crate) async fn store_response(&self, target: &Target, request: &Request, response: &Response) -> bool {
        if !response.is_success() {
            tracing::debug!(url = %request.url, status = response.status.as_u16(), "not caching unsuccessful response");
            return false;
        }
        if response.body.len() > self.max_entry_bytes {
            tracing::debug!(url = %request.url, bytes = response.body.len(), "not caching oversized response");
            return false;
        }

        let entry = response.to_entry(request, self.now());
        match self.store.put(&target.partition, &target.key, &entry).await {
            Ok(()) => {
                self.stats.store();
                true
            }
            Err(e) => {
                self.stats.store_error();
                tracing::warn!(partition = %target.partition, url = %request.url, error = %e, "cache write failed");
                false
            }
        }
    }
}

pub(crate) fn unavailable(request: &Request, cause: &Error) -> Error {
    Error::ResourceUnavailable(format!("{}: {}", request.url, cause))
}
