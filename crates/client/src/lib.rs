//! Request interception for the Beekon offline cache.
//!
//! This crate provides the request/response model, the network fetcher,
//! request classification, the three caching strategies, offline fallbacks
//! and the [`CacheWorker`] lifecycle shared by the server and CLI.

pub mod classify;
pub mod fallback;
pub mod fetch;
pub mod message;
pub mod partition;
pub mod stats;
pub mod strategy;
pub mod sync;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
pub use reqwest::{Method, StatusCode};

pub use classify::{Classification, ClassificationRule, ResourceClass, RuleTable, Strategy};
pub use fetch::{FetchConfig, Fetcher, HttpFetcher, UrlError, canonicalize};
pub use message::{CACHED_AT_HEADER, Request, Response};
pub use partition::{Partition, PartitionSet};
pub use stats::CacheStats;
pub use strategy::{Handled, ResponseSource, Revalidation, RevalidationOutcome, StrategyContext, Target};
pub use sync::SyncReport;
pub use worker::{CacheLookup, CacheWorker, InstallFailure, InstallReport, SweepReport, WorkerStats};
