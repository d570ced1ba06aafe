//! The cache worker: one explicitly constructed value per host process.
//!
//! Each lifecycle phase is a method:
//! - [`CacheWorker::install`] precaches the app shell
//! - [`CacheWorker::activate`] evicts partitions from older cache versions
//! - [`CacheWorker::fetch`] serves one intercepted request
//! - [`CacheWorker::sync`] replays writes queued while offline
//! - [`CacheWorker::sweep`] drops entries past their partition TTL
//!
//! Storage, network and time are injected so hosts and tests pick their own.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use beekon_core::{AppConfig, CacheDb, CachedEntry, Clock, Error, PartitionStore, SyncQueue, SystemClock};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use url::Url;

use crate::classify::{Classification, ResourceClass, RuleTable, Strategy};
use crate::fallback;
use crate::fetch::{FetchConfig, Fetcher, HttpFetcher, canonicalize};
use crate::message::{Request, Response};
use crate::partition::{Partition, PartitionSet};
use crate::stats::CacheStats;
use crate::strategy::{
    Handled, ResponseSource, StrategyContext, Target, cache_first, network_first, stale_while_revalidate,
};
use crate::sync::{SyncReport, replay};

/// Shell URLs tried, in order, when a navigation cannot be served.
const SHELL_URLS: &[&str] = &["/", "/index.html"];

#[derive(Debug, Clone, Serialize)]
pub struct InstallFailure {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub failed: Vec<InstallFailure>,
}

/// Entries removed per partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub removed: BTreeMap<String, u64>,
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.removed.values().sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerStats {
    pub backend: &'static str,
    pub cache_version: u32,
    pub counters: CacheStats,
    pub hit_ratio: f64,
    pub entries: BTreeMap<String, u64>,
    pub queued_writes: u64,
}

/// What the cache holds for one URL.
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub url: Url,
    pub classification: Classification,
    pub partition: String,
    pub entry: Option<CachedEntry>,
    pub fresh: bool,
}

pub struct CacheWorker {
    ctx: StrategyContext,
    queue: Arc<dyn SyncQueue>,
    rules: RuleTable,
    partitions: PartitionSet,
    origin: Url,
    precache_urls: Vec<String>,
    offline_url: Option<String>,
    background_sync: bool,
    max_sync_attempts: u32,
    sweep_interval: Duration,
}

impl CacheWorker {
    pub fn new(
        config: &AppConfig, store: Arc<dyn PartitionStore>, queue: Arc<dyn SyncQueue>, fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, Error> {
        config.validate().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin {}: {e}", config.origin)))?;
        let ctx = StrategyContext::new(store, fetcher, Arc::new(SystemClock))
            .with_max_entry_bytes(config.max_entry_bytes);

        Ok(Self {
            ctx,
            queue,
            rules: RuleTable::with_defaults(&config.metrics_patterns)?,
            partitions: PartitionSet::from_config(config),
            origin,
            precache_urls: config.precache_urls.clone(),
            offline_url: config.offline_url.clone(),
            background_sync: config.background_sync,
            max_sync_attempts: config.max_sync_attempts,
            sweep_interval: config.sweep_interval(),
        })
    }

    /// Worker backed by SQLite (on disk, or in memory when `in_memory` is set)
    /// and the reqwest fetcher.
    pub async fn open(config: &AppConfig) -> Result<Self, Error> {
        let db = if config.in_memory {
            CacheDb::open_in_memory().await?
        } else {
            CacheDb::open(&config.db_path).await?
        };
        let db = Arc::new(db);
        let fetcher = Arc::new(HttpFetcher::new(FetchConfig::from_app_config(config))?);
        tracing::info!(backend = db.name(), origin = %config.origin, version = config.cache_version, "cache worker opened");
        Self::new(config, db.clone(), db, fetcher)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ctx = self.ctx.with_clock(clock);
        self
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn partitions(&self) -> &PartitionSet {
        &self.partitions
    }

    /// Resolve a path or absolute URL against the origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        canonicalize(input, Some(&self.origin)).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    pub fn classify(&self, url: &Url) -> Classification {
        self.rules.classify(url)
    }

    /// Precache the app shell and offline page into the static partition.
    pub async fn install(&self) -> InstallReport {
        let mut report = InstallReport::default();
        let mut urls: Vec<&str> = self.precache_urls.iter().map(String::as_str).collect();
        if let Some(offline) = self.offline_url.as_deref()
            && !urls.contains(&offline)
        {
            urls.push(offline);
        }

        let partition = self.partitions.storage_name(Partition::Static);
        for input in urls {
            match self.precache(input, &partition).await {
                Ok(url) => report.cached.push(url),
                Err(reason) => {
                    tracing::warn!(url = input, reason = %reason, "precache failed");
                    report.failed.push(InstallFailure { url: input.to_string(), reason });
                }
            }
        }

        tracing::info!(cached = report.cached.len(), failed = report.failed.len(), "install finished");
        report
    }

    async fn precache(&self, input: &str, partition: &str) -> Result<String, String> {
        let url = self.resolve(input).map_err(|e| e.to_string())?;
        let request = Request::get(url);
        let target =
            Target { partition: partition.to_string(), key: request.key(), ttl: self.partitions.ttl(Partition::Static) };

        let response = self.ctx.network(&request).await.map_err(|e| e.to_string())?;
        if !response.is_success() {
            return Err(format!("HTTP {}", response.status.as_u16()));
        }
        if !self.ctx.store_response(&target, &request, &response).await {
            return Err("not stored".to_string());
        }
        Ok(request.url.to_string())
    }

    /// Drop every partition not belonging to the current cache version.
    /// Returns the number of entries removed.
    pub async fn activate(&self) -> Result<u64, Error> {
        let removed = self.ctx.store().retain_partitions(&self.partitions.storage_names()).await?;
        tracing::info!(version = self.partitions.version(), removed, "activated");
        Ok(removed)
    }

    /// Serve one request.
    pub async fn fetch(&self, mut request: Request) -> Result<Handled, Error> {
        request.url.set_fragment(None);
        let classification = self.rules.classify(&request.url);
        if !request.is_cacheable() {
            return self.passthrough(request, classification).await;
        }

        let partition = classification.partition;
        let target = Target {
            partition: self.partitions.storage_name(partition),
            key: request.key(),
            ttl: self.partitions.ttl(partition),
        };
        tracing::debug!(
            url = %request.url,
            class = classification.class.as_str(),
            partition = %target.partition,
            "handling request"
        );

        let result = match classification.strategy {
            Strategy::CacheFirst => cache_first(&self.ctx, &request, &target).await,
            Strategy::NetworkFirst => network_first(&self.ctx, &request, &target).await,
            Strategy::StaleWhileRevalidate => stale_while_revalidate(&self.ctx, &request, &target).await,
        };

        match result {
            Err(Error::ResourceUnavailable(reason)) => self.fallback(classification.class, &request, reason).await,
            other => other,
        }
    }

    /// Non-GET requests go straight to the network. Failed writes to
    /// network-first api endpoints are queued for replay when background sync
    /// is on; other failed api requests get the synthetic 503.
    async fn passthrough(&self, request: Request, classification: Classification) -> Result<Handled, Error> {
        let err = match self.ctx.network(&request).await {
            Ok(response) => return Ok(Handled::new(response, ResponseSource::Network)),
            Err(e) => e,
        };
        if !err.is_network() || classification.class != ResourceClass::Api {
            return Err(err);
        }

        let replayable = classification.strategy == Strategy::NetworkFirst && request.is_write();
        if self.background_sync && replayable {
            match self.queue.enqueue(&request.to_pending_write(), self.ctx.now()).await {
                Ok(id) => {
                    tracing::info!(id, method = %request.method, url = %request.url, "write queued for background sync");
                    return Ok(Handled::new(fallback::queued(id), ResponseSource::Queued));
                }
                Err(e) => {
                    self.ctx.counters().store_error();
                    tracing::warn!(url = %request.url, error = %e, "could not queue write");
                }
            }
        }

        self.fallback(ResourceClass::Api, &request, err.to_string()).await
    }

    async fn fallback(&self, class: ResourceClass, request: &Request, reason: String) -> Result<Handled, Error> {
        let response = match class {
            ResourceClass::Static => return Err(Error::ResourceUnavailable(reason)),
            ResourceClass::Image => fallback::image_placeholder(),
            ResourceClass::Api => fallback::network_error(request.url.as_str()),
            ResourceClass::Navigation => match self.offline_shell().await {
                Some(shell) => shell,
                None => fallback::offline_page(),
            },
        };
        self.ctx.counters().fallback();
        tracing::debug!(url = %request.url, class = class.as_str(), "serving fallback");
        Ok(Handled::new(response, ResponseSource::Fallback))
    }

    /// Cached offline page or app shell, at any age.
    async fn offline_shell(&self) -> Option<Response> {
        let candidates = self.offline_url.as_deref().into_iter().chain(SHELL_URLS.iter().copied());
        let partitions =
            [self.partitions.storage_name(Partition::Pages), self.partitions.storage_name(Partition::Static)];

        for input in candidates {
            let Ok(url) = self.resolve(input) else { continue };
            let key = Request::get(url).key();
            for partition in &partitions {
                match self.ctx.store().get(partition, &key).await {
                    Ok(Some(entry)) => match Response::from_entry(&entry) {
                        Ok(response) => return Some(response),
                        Err(e) => tracing::warn!(url = %entry.url, error = %e, "ignoring unreadable shell entry"),
                    },
                    Ok(None) => {}
                    Err(e) => {
                        self.ctx.counters().store_error();
                        tracing::warn!(partition = %partition, error = %e, "shell lookup failed");
                    }
                }
            }
        }
        None
    }

    /// Replay queued writes.
    pub async fn sync(&self) -> Result<SyncReport, Error> {
        replay(self.queue.as_ref(), self.ctx.fetcher().as_ref(), self.max_sync_attempts).await
    }

    /// Remove entries whose age has reached their partition's TTL.
    pub async fn sweep(&self) -> Result<SweepReport, Error> {
        let now = self.ctx.now();
        let mut report = SweepReport::default();

        for partition in Partition::ALL {
            let name = self.partitions.storage_name(partition);
            let ttl = self.partitions.ttl(partition);
            let expired = move |meta: &beekon_core::cache::EntryMeta| {
                (now - meta.cached_at).to_std().map(|age| age >= ttl).unwrap_or(false)
            };
            let removed = self.ctx.store().sweep(&name, &expired).await?;
            if removed > 0 {
                tracing::debug!(partition = %name, removed, "swept expired entries");
            }
            report.removed.insert(name, removed);
        }

        tracing::info!(removed = report.total(), "sweep finished");
        Ok(report)
    }

    /// Sweep (and replay queued writes, when background sync is on) every
    /// `sweep_interval`. The first run happens one interval after spawning.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let worker = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(worker.sweep_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                interval.tick().await;
                if let Err(e) = worker.sweep().await {
                    tracing::warn!(error = %e, "periodic sweep failed");
                }
                if worker.background_sync && worker.queue.len().await.is_ok_and(|n| n > 0) {
                    match worker.sync().await {
                        Ok(report) => tracing::debug!(replayed = report.replayed, "background sync ran"),
                        Err(e) => tracing::warn!(error = %e, "background sync failed"),
                    }
                }
            }
        })
    }

    /// Clear one partition of the current version, or every stored partition.
    pub async fn clear(&self, partition: Option<Partition>) -> Result<u64, Error> {
        let store = self.ctx.store();
        let names = match partition {
            Some(partition) => vec![self.partitions.storage_name(partition)],
            None => store.partitions().await?,
        };

        let mut removed = 0;
        for name in &names {
            removed += store.clear(name).await?;
        }
        tracing::info!(partitions = names.len(), removed, "cache cleared");
        Ok(removed)
    }

    pub fn counters(&self) -> CacheStats {
        self.ctx.stats()
    }

    pub async fn stats(&self) -> Result<WorkerStats, Error> {
        let store = self.ctx.store();
        let mut entries = BTreeMap::new();
        for name in self.partitions.storage_names() {
            let count = store.count(&name).await?;
            entries.insert(name, count);
        }
        let counters = self.ctx.stats();

        Ok(WorkerStats {
            backend: store.name(),
            cache_version: self.partitions.version(),
            hit_ratio: counters.hit_ratio(),
            counters,
            entries,
            queued_writes: self.queue.len().await?,
        })
    }

    /// Inspect the cache for a URL without touching the network.
    pub async fn lookup(&self, input: &str) -> Result<CacheLookup, Error> {
        let url = self.resolve(input)?;
        let classification = self.rules.classify(&url);
        let partition = self.partitions.storage_name(classification.partition);
        let key = Request::get(url.clone()).key();

        let entry = self.ctx.store().get(&partition, &key).await?;
        let fresh = entry
            .as_ref()
            .is_some_and(|e| e.is_fresh(self.partitions.ttl(classification.partition), self.ctx.now()));
        Ok(CacheLookup { url, classification, partition, entry, fresh })
    }
}
