//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `max_entry_bytes` is 0 or exceeds 100MB
    /// - `user_agent` or `origin` is empty, or `origin` is not an absolute http(s) URL
    /// - any partition TTL or the sweep interval is 0
    /// - `max_sync_attempts` is 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.max_entry_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "max_entry_bytes".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.max_entry_bytes > 100 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_entry_bytes".into(), reason: "must not exceed 100MB".into() });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if !(self.origin.starts_with("http://") || self.origin.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "origin".into(),
                reason: "must be an absolute http(s) URL".into(),
            });
        }

        let ttls = [
            ("static_ttl_secs", self.static_ttl_secs),
            ("api_ttl_secs", self.api_ttl_secs),
            ("images_ttl_secs", self.images_ttl_secs),
            ("metrics_ttl_secs", self.metrics_ttl_secs),
            ("pages_ttl_secs", self.pages_ttl_secs),
            ("sweep_interval_secs", self.sweep_interval_secs),
        ];
        if let Some((field, _)) = ttls.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::Invalid { field: (*field).into(), reason: "must be greater than 0".into() });
        }

        if self.max_sync_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "max_sync_attempts".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.precache_urls.is_empty() && self.offline_url.is_none() {
            tracing::warn!("no precache_urls and no offline_url; offline navigations will get the built-in page");
        }

        Ok(())
    }
}
