//! Cache inspection and maintenance tools.

pub mod clear;
pub mod get;
pub mod stats;
pub mod sweep;

pub use clear::{CacheClearParams, clear_impl};
pub use get::{CacheGetParams, get_impl};
pub use stats::stats_impl;
pub use sweep::sweep_impl;
