//! Queue of writes made while offline, replayed by the sync phase.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;

use super::connection::CacheDb;
use super::entries::{format_timestamp, parse_timestamp};
use super::store::{PendingWrite, QueuedRequest, SyncQueue};
use crate::Error;

#[async_trait]
impl SyncQueue for CacheDb {
    async fn enqueue(&self, write: &PendingWrite, queued_at: DateTime<Utc>) -> Result<i64, Error> {
        let headers_json = serde_json::to_string(&write.headers)?;
        let queued_at = format_timestamp(queued_at);
        let write = write.clone();

        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO sync_queue (method, url, headers_json, body, queued_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![write.method, write.url, headers_json, write.body, queued_at],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
    }

    async fn pending(&self, limit: usize) -> Result<Vec<QueuedRequest>, Error> {
        let limit = limit as i64;
        self.conn
            .call(move |conn| -> Result<Vec<QueuedRequest>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, method, url, headers_json, body, queued_at, attempts, last_error
                    FROM sync_queue ORDER BY id ASC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<Vec<u8>>>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, Option<String>>(7)?,
                    ))
                })?;

                let mut queued = Vec::new();
                for row in rows {
                    let (id, method, url, headers_json, body, queued_at, attempts, last_error) = row?;
                    queued.push(QueuedRequest {
                        id,
                        write: PendingWrite { method, url, headers: serde_json::from_str(&headers_json)?, body },
                        queued_at: parse_timestamp(&queued_at)?,
                        attempts: attempts.max(0) as u32,
                        last_error,
                    });
                }
                Ok(queued)
            })
            .await
            .map_err(Error::from)
    }

    async fn record_failure(&self, id: i64, error: &str) -> Result<(), Error> {
        let error = error.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE sync_queue SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
                    params![id, error],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn remove(&self, id: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM sync_queue WHERE id = ?1", params![id])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn len(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM sync_queue", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
