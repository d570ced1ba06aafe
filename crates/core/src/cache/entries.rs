//! Partition entry operations on the SQLite store.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::store::{CachedEntry, EntryMeta, PartitionStore, SweepPredicate};
use crate::Error;

/// Timestamps are stored as fixed-width RFC 3339 so they sort as text.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::CorruptEntry(format!("bad timestamp {raw:?}: {e}")))
}

struct RawEntry {
    method: String,
    url: String,
    status: i64,
    headers_json: String,
    body: Vec<u8>,
    cached_at: String,
}

impl RawEntry {
    fn into_entry(self) -> Result<CachedEntry, Error> {
        let status = u16::try_from(self.status).map_err(|_| Error::CorruptEntry(format!("status {}", self.status)))?;
        Ok(CachedEntry {
            method: self.method,
            url: self.url,
            status,
            headers: serde_json::from_str(&self.headers_json)?,
            body: self.body,
            cached_at: parse_timestamp(&self.cached_at)?,
        })
    }
}

#[async_trait]
impl PartitionStore for CacheDb {
    async fn get(&self, partition: &str, key: &str) -> Result<Option<CachedEntry>, Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, headers_json, body, cached_at
                    FROM entries WHERE partition = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![partition, key], |row| {
                    Ok(RawEntry {
                        method: row.get(0)?,
                        url: row.get(1)?,
                        status: row.get(2)?,
                        headers_json: row.get(3)?,
                        body: row.get(4)?,
                        cached_at: row.get(5)?,
                    })
                });

                match result {
                    Ok(raw) => raw.into_entry().map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, partition: &str, key: &str, entry: &CachedEntry) -> Result<(), Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        let headers_json = serde_json::to_string(&entry.headers)?;
        let cached_at = format_timestamp(entry.cached_at);
        let entry = entry.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (partition, key, method, url, status, headers_json, body, cached_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(partition, key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        cached_at = excluded.cached_at",
                    params![
                        partition,
                        key,
                        entry.method,
                        entry.url,
                        i64::from(entry.status),
                        headers_json,
                        entry.body,
                        cached_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, partition: &str, key: &str) -> Result<bool, Error> {
        let partition = partition.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count =
                    conn.execute("DELETE FROM entries WHERE partition = ?1 AND key = ?2", params![partition, key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn sweep(&self, partition: &str, predicate: &SweepPredicate<'_>) -> Result<u64, Error> {
        let owned = partition.to_string();
        let candidates = self
            .conn
            .call(move |conn| -> Result<Vec<(EntryMeta, String)>, Error> {
                let mut stmt =
                    conn.prepare("SELECT key, url, cached_at, length(body) FROM entries WHERE partition = ?1")?;
                let rows = stmt.query_map(params![owned], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?, row.get::<_, i64>(3)?))
                })?;

                let mut candidates = Vec::new();
                for row in rows {
                    let (key, url, raw_cached_at, size) = row?;
                    let meta = EntryMeta {
                        partition: owned.clone(),
                        key,
                        url,
                        cached_at: parse_timestamp(&raw_cached_at)?,
                        size: size.max(0) as usize,
                    };
                    candidates.push((meta, raw_cached_at));
                }
                Ok(candidates)
            })
            .await
            .map_err(Error::from)?;

        let doomed: Vec<(String, String)> = candidates
            .into_iter()
            .filter(|(meta, _)| predicate(meta))
            .map(|(meta, raw_cached_at)| (meta.key, raw_cached_at))
            .collect();

        if doomed.is_empty() {
            return Ok(0);
        }

        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let mut deleted = 0u64;
                {
                    let mut stmt =
                        tx.prepare("DELETE FROM entries WHERE partition = ?1 AND key = ?2 AND cached_at = ?3")?;
                    for (key, cached_at) in &doomed {
                        deleted += stmt.execute(params![partition, key, cached_at])? as u64;
                    }
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from)
    }

    async fn clear(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE partition = ?1", params![partition])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT DISTINCT partition FROM entries ORDER BY partition")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn count(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
