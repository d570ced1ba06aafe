//! Partitioned response cache.
//!
//! - [`PartitionStore`] and [`SyncQueue`] describe the durable storage the
//!   strategies rely on
//! - [`CacheDb`] implements both on SQLite (WAL, migrations)
//! - [`MemoryStore`] implements both in process memory

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod outbox;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryStore;
pub use store::{CachedEntry, EntryMeta, PartitionStore, PendingWrite, QueuedRequest, SweepPredicate, SyncQueue};
