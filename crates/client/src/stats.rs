//! Request counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub stale_hits: u64,
    pub misses: u64,
    pub network_fetches: u64,
    pub network_failures: u64,
    pub stores: u64,
    pub store_errors: u64,
    pub fallbacks: u64,
    pub revalidations: u64,
}

impl CacheStats {
    /// Fresh hits over all lookups; stale entries count as misses.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

#[derive(Debug, Default)]
pub struct AtomicStats {
    hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
    network_fetches: AtomicU64,
    network_failures: AtomicU64,
    stores: AtomicU64,
    store_errors: AtomicU64,
    fallbacks: AtomicU64,
    revalidations: AtomicU64,
}

macro_rules! counter {
    ($($name:ident => $field:ident),* $(,)?) => {
        impl AtomicStats {
            $(
                pub(crate) fn $name(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )*
        }
    };
}

counter! {
    hit => hits,
    stale_hit => stale_hits,
    miss => misses,
    network_fetch => network_fetches,
    network_failure => network_failures,
    store => stores,
    store_error => store_errors,
    fallback => fallbacks,
    revalidation => revalidations,
}

impl AtomicStats {
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            network_fetches: self.network_fetches.load(Ordering::Relaxed),
            network_failures: self.network_failures.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            revalidations: self.revalidations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_ratio() {
        let stats = AtomicStats::default();
        assert_eq!(stats.snapshot().hit_ratio(), 0.0);
        stats.hit();
        stats.miss();
        stats.stale_hit();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.hits, 1);
        assert_eq!(snapshot.stale_hits, 1);
        assert!((snapshot.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }
}
