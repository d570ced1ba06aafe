//! Storage abstractions for cache partitions and the write-replay queue.
//!
//! Partitions are plain string names. Callers own the naming scheme
//! (the worker uses `<name>-v<version>`); stores only group entries by it.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Immutable snapshot of a response at capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Capture timestamp; the only input to freshness checks.
    pub cached_at: DateTime<Utc>,
}

impl CachedEntry {
    /// Whether the entry is younger than `ttl` at `now`.
    ///
    /// Entries captured "in the future" (clock skew) count as fresh.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match (now - self.cached_at).to_std() {
            Ok(age) => age < ttl,
            Err(_) => true,
        }
    }

    pub fn size(&self) -> usize {
        self.body.len()
    }
}

/// Lightweight view of an entry handed to sweep predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    pub partition: String,
    pub key: String,
    pub url: String,
    pub cached_at: DateTime<Utc>,
    pub size: usize,
}

/// Predicate deciding which entries a sweep removes.
pub type SweepPredicate<'a> = dyn Fn(&EntryMeta) -> bool + Send + Sync + 'a;

/// Durable key-value store backing the cache partitions.
///
/// Writes to the same key are last-writer-wins; there is no versioning.
#[async_trait]
pub trait PartitionStore: Send + Sync {
    async fn get(&self, partition: &str, key: &str) -> Result<Option<CachedEntry>, Error>;

    /// Insert or wholesale replace an entry.
    async fn put(&self, partition: &str, key: &str, entry: &CachedEntry) -> Result<(), Error>;

    /// Returns whether an entry was removed.
    async fn delete(&self, partition: &str, key: &str) -> Result<bool, Error>;

    /// Remove every entry of `partition` matching `predicate`.
    ///
    /// An entry replaced while the sweep runs is left alone.
    async fn sweep(&self, partition: &str, predicate: &SweepPredicate<'_>) -> Result<u64, Error>;

    /// Remove every entry of `partition`.
    async fn clear(&self, partition: &str) -> Result<u64, Error>;

    /// Names of all partitions holding at least one entry.
    async fn partitions(&self) -> Result<Vec<String>, Error>;

    async fn count(&self, partition: &str) -> Result<u64, Error>;

    /// Drop every partition not named in `keep`. Returns deleted entries.
    async fn retain_partitions(&self, keep: &[String]) -> Result<u64, Error> {
        let mut deleted = 0;
        for partition in self.partitions().await? {
            if !keep.contains(&partition) {
                deleted += self.clear(&partition).await?;
            }
        }
        Ok(deleted)
    }

    fn name(&self) -> &'static str;
}

/// A mutating request waiting to be replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWrite {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedRequest {
    pub id: i64,
    pub write: PendingWrite,
    pub queued_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// FIFO queue of writes made while offline.
#[async_trait]
pub trait SyncQueue: Send + Sync {
    /// Append a write; returns its id.
    async fn enqueue(&self, write: &PendingWrite, queued_at: DateTime<Utc>) -> Result<i64, Error>;

    /// Oldest first.
    async fn pending(&self, limit: usize) -> Result<Vec<QueuedRequest>, Error>;

    /// Bump the attempt counter and remember the failure.
    async fn record_failure(&self, id: i64, error: &str) -> Result<(), Error>;

    async fn remove(&self, id: i64) -> Result<bool, Error>;

    async fn len(&self) -> Result<u64, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn entry_at(cached_at: DateTime<Utc>) -> CachedEntry {
        CachedEntry {
            method: "GET".into(),
            url: "https://example.com/".into(),
            status: 200,
            headers: vec![],
            body: b"hello".to_vec(),
            cached_at,
        }
    }

    #[test]
    fn test_freshness_boundary() {
        let t = Utc::now();
        let entry = entry_at(t);
        let ttl = Duration::from_secs(300);
        assert!(entry.is_fresh(ttl, t + ChronoDuration::seconds(299)));
        assert!(!entry.is_fresh(ttl, t + ChronoDuration::seconds(300)));
        assert!(!entry.is_fresh(ttl, t + ChronoDuration::minutes(6)));
    }

    #[test]
    fn test_future_entry_is_fresh() {
        let t = Utc::now();
        let entry = entry_at(t + ChronoDuration::seconds(30));
        assert!(entry.is_fresh(Duration::from_secs(1), t));
    }

    #[test]
    fn test_entry_size() {
        assert_eq!(entry_at(Utc::now()).size(), 5);
    }
}
