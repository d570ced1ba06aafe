//! Core types and shared functionality for the Beekon offline cache.
//!
//! This crate provides:
//! - Partition store abstraction with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures
//! - Clock abstraction for TTL computation

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CachedEntry, MemoryStore, PartitionStore, PendingWrite, SyncQueue};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
