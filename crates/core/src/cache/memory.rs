//! In-process store for ephemeral hosts and tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::store::{CachedEntry, EntryMeta, PartitionStore, PendingWrite, QueuedRequest, SweepPredicate, SyncQueue};
use crate::Error;

type Partitions = HashMap<String, HashMap<String, CachedEntry>>;

/// Partition store and sync queue held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: RwLock<Partitions>,
    queue: RwLock<BTreeMap<i64, QueuedRequest>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Partitions>, Error> {
        self.partitions.read().map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Partitions>, Error> {
        self.partitions.write().map_err(|_| Error::Storage("memory store lock poisoned".into()))
    }

    fn queue(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<i64, QueuedRequest>>, Error> {
        self.queue.write().map_err(|_| Error::Storage("sync queue lock poisoned".into()))
    }
}

#[async_trait]
impl PartitionStore for MemoryStore {
    async fn get(&self, partition: &str, key: &str) -> Result<Option<CachedEntry>, Error> {
        Ok(self.read()?.get(partition).and_then(|entries| entries.get(key)).cloned())
    }

    async fn put(&self, partition: &str, key: &str, entry: &CachedEntry) -> Result<(), Error> {
        self.write()?.entry(partition.to_string()).or_default().insert(key.to_string(), entry.clone());
        Ok(())
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<bool, Error> {
        let mut partitions = self.write()?;
        let removed = partitions.get_mut(partition).and_then(|entries| entries.remove(key)).is_some();
        if partitions.get(partition).is_some_and(HashMap::is_empty) {
            partitions.remove(partition);
        }
        Ok(removed)
    }

    async fn sweep(&self, partition: &str, predicate: &SweepPredicate<'_>) -> Result<u64, Error> {
        let mut partitions = self.write()?;
        let Some(entries) = partitions.get_mut(partition) else {
            return Ok(0);
        };

        let before = entries.len();
        entries.retain(|key, entry| {
            let meta = EntryMeta {
                partition: partition.to_string(),
                key: key.clone(),
                url: entry.url.clone(),
                cached_at: entry.cached_at,
                size: entry.size(),
            };
            !predicate(&meta)
        });
        let deleted = (before - entries.len()) as u64;

        if entries.is_empty() {
            partitions.remove(partition);
        }
        Ok(deleted)
    }

    async fn clear(&self, partition: &str) -> Result<u64, Error> {
        Ok(self.write()?.remove(partition).map(|entries| entries.len() as u64).unwrap_or(0))
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn count(&self, partition: &str) -> Result<u64, Error> {
        Ok(self.read()?.get(partition).map(|entries| entries.len() as u64).unwrap_or(0))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[async_trait]
impl SyncQueue for MemoryStore {
    async fn enqueue(&self, write: &PendingWrite, queued_at: DateTime<Utc>) -> Result<i64, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.queue()?.insert(id, QueuedRequest { id, write: write.clone(), queued_at, attempts: 0, last_error: None });
        Ok(id)
    }

    async fn pending(&self, limit: usize) -> Result<Vec<QueuedRequest>, Error> {
        Ok(self.queue()?.values().take(limit).cloned().collect())
    }

    async fn record_failure(&self, id: i64, error: &str) -> Result<(), Error> {
        if let Some(queued) = self.queue()?.get_mut(&id) {
            queued.attempts += 1;
            queued.last_error = Some(error.to_string());
        }
        Ok(())
    }

    async fn remove(&self, id: i64) -> Result<bool, Error> {
        Ok(self.queue()?.remove(&id).is_some())
    }

    async fn len(&self) -> Result<u64, Error> {
        Ok(self.queue()?.len() as u64)
    }
}
