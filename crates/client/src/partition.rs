//! Cache partitions and their TTL policies.

use std::fmt;
use std::time::Duration;

use beekon_core::AppConfig;
use serde::{Deserialize, Serialize};

/// A named cache bucket grouping requests of one resource class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Static,
    Api,
    Images,
    Metrics,
    Pages,
}

impl Partition {
    pub const ALL: [Partition; 5] = [Partition::Static, Partition::Api, Partition::Images, Partition::Metrics, Partition::Pages];

    pub fn as_str(self) -> &'static str {
        match self {
            Partition::Static => "static",
            Partition::Api => "api",
            Partition::Images => "images",
            Partition::Metrics => "metrics",
            Partition::Pages => "pages",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Versioned storage names and TTLs for every partition.
#[derive(Debug, Clone)]
pub struct PartitionSet {
    version: u32,
    ttls: [Duration; 5],
}

impl PartitionSet {
    pub fn from_config(config: &AppConfig) -> Self {
        let mut ttls = [Duration::ZERO; 5];
        ttls[Partition::Static.index()] = Duration::from_secs(config.static_ttl_secs);
        ttls[Partition::Api.index()] = Duration::from_secs(config.api_ttl_secs);
        ttls[Partition::Images.index()] = Duration::from_secs(config.images_ttl_secs);
        ttls[Partition::Metrics.index()] = Duration::from_secs(config.metrics_ttl_secs);
        ttls[Partition::Pages.index()] = Duration::from_secs(config.pages_ttl_secs);
        Self { version: config.cache_version, ttls }
    }

    pub fn with_ttl(mut self, partition: Partition, ttl: Duration) -> Self {
        self.ttls[partition.index()] = ttl;
        self
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn ttl(&self, partition: Partition) -> Duration {
        self.ttls[partition.index()]
    }

    /// Name used in the store, e.g. `api-v3`.
    pub fn storage_name(&self, partition: Partition) -> String {
        format!("{}-v{}", partition.as_str(), self.version)
    }

    pub fn storage_names(&self) -> Vec<String> {
        Partition::ALL.into_iter().map(|p| self.storage_name(p)).collect()
    }
}

impl Default for PartitionSet {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_names_carry_version() {
        let config = AppConfig { cache_version: 3, ..Default::default() };
        let set = PartitionSet::from_config(&config);
        assert_eq!(set.storage_name(Partition::Api), "api-v3");
        assert_eq!(set.storage_names().len(), 5);
        assert!(set.storage_names().iter().all(|n| n.ends_with("-v3")));
    }

    #[test]
    fn test_ttls_from_config() {
        let config = AppConfig { api_ttl_secs: 300, images_ttl_secs: 60, ..Default::default() };
        let set = PartitionSet::from_config(&config);
        assert_eq!(set.ttl(Partition::Api), Duration::from_secs(300));
        assert_eq!(set.ttl(Partition::Images), Duration::from_secs(60));

        let set = set.with_ttl(Partition::Api, Duration::from_secs(5));
        assert_eq!(set.ttl(Partition::Api), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_partition() {
        assert_eq!(Partition::parse("metrics"), Some(Partition::Metrics));
        assert_eq!(Partition::parse("metrics-v1"), None);
    }
}
