//! Test doubles shared by the strategy and worker tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use beekon_core::cache::SweepPredicate;
use beekon_core::{CachedEntry, Clock, Error, ManualClock, MemoryStore, PartitionStore};
use bytes::Bytes;
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

use crate::fetch::Fetcher;
use crate::message::{Request, Response};
use crate::strategy::{StrategyContext, Target};

/// Fetcher answering from a route table; unknown URLs get a 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, (StatusCode, Bytes)>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
    total: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) {
        let status = StatusCode::from_u16(status).unwrap();
        self.routes.lock().unwrap().insert(url.to_string(), (status, Bytes::from(body.to_string())));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.total.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(request.url.to_string());

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("connection refused".into()));
        }

        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        Ok(match route {
            Some((status, body)) => Response::new(status, body),
            None => Response::new(StatusCode::NOT_FOUND, "not found"),
        })
    }
}

/// Store whose every operation fails like an exhausted quota.
pub struct FailingStore;

#[async_trait]
impl PartitionStore for FailingStore {
    async fn get(&self, _partition: &str, _key: &str) -> Result<Option<CachedEntry>, Error> {
        Err(Error::Storage("quota exceeded".into()))
    }

    async fn put(&self, _partition: &str, _key: &str, _entry: &CachedEntry) -> Result<(), Error> {
        Err(Error::Storage("quota exceeded".into()))
    }

    async fn delete(&self, _partition: &str, _key: &str) -> Result<bool, Error> {
        Err(Error::Storage("quota exceeded".into()))
    }

    async fn sweep(&self, _partition: &str, _predicate: &SweepPredicate<'_>) -> Result<u64, Error> {
        Err(Error::Storage("quota exceeded".into()))
    }

    async fn clear(&self, _partition: &str) -> Result<u64, Error> {
        Err(Error::Storage("quota exceeded".into()))
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        Err(Error::Storage("quota exceeded".into()))
    }

    async fn count(&self, _partition: &str) -> Result<u64, Error> {
        Err(Error::Storage("quota exceeded".into()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

pub struct Harness {
    pub ctx: StrategyContext,
    pub store: Arc<MemoryStore>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub clock: Arc<ManualClock>,
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let fetcher = ScriptedFetcher::new();
    let clock = Arc::new(ManualClock::default());
    let ctx = StrategyContext::new(store.clone(), fetcher.clone(), clock.clone() as Arc<dyn Clock>);
    Harness { ctx, store, fetcher, clock }
}

pub fn get(url: &str) -> Request {
    Request::get(Url::parse(url).unwrap())
}

pub fn target(partition: &str, request: &Request, ttl: Duration) -> Target {
    Target { partition: partition.to_string(), key: request.key(), ttl }
}

pub async fn stored(store: &MemoryStore, partition: &str) -> u64 {
    store.count(partition).await.unwrap()
}
