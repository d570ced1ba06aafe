//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BEEKON_SW_*)
//! 2. TOML config file (if BEEKON_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BEEKON_SW_*)
/// 2. TOML config file (if BEEKON_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache database.
    ///
    /// Set via BEEKON_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Keep partitions in process memory instead of SQLite.
    #[serde(default)]
    pub in_memory: bool,

    /// Origin that relative request URLs are resolved against.
    ///
    /// Set via BEEKON_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for network fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects followed per fetch.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Responses larger than this are served but never stored.
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: usize,

    /// Cache version. Partitions from other versions are evicted on activate.
    ///
    /// Set via BEEKON_SW_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: u32,

    /// Interval between background TTL sweeps, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_static_ttl_secs")]
    pub static_ttl_secs: u64,

    #[serde(default = "default_api_ttl_secs")]
    pub api_ttl_secs: u64,

    #[serde(default = "default_images_ttl_secs")]
    pub images_ttl_secs: u64,

    #[serde(default = "default_metrics_ttl_secs")]
    pub metrics_ttl_secs: u64,

    #[serde(default = "default_pages_ttl_secs")]
    pub pages_ttl_secs: u64,

    /// App shell URLs cached during install.
    ///
    /// Set via BEEKON_SW_PRECACHE_URLS as a bracketed list, e.g. `[/, /app.js]`.
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// Page served to navigations when both network and cache miss.
    #[serde(default = "default_offline_url")]
    pub offline_url: Option<String>,

    /// Path patterns served stale-while-revalidate from the metrics partition.
    #[serde(default = "default_metrics_patterns")]
    pub metrics_patterns: Vec<String>,

    /// Queue failed writes for replay by the sync phase.
    #[serde(default = "default_true")]
    pub background_sync: bool,

    /// Queued writes are dropped after this many failed replays.
    #[serde(default = "default_max_sync_attempts")]
    pub max_sync_attempts: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./beekon-sw-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_user_agent() -> String {
    "beekon-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_entry_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_cache_version() -> u32 {
    1
}

fn default_sweep_interval_secs() -> u64 {
    3_600
}

fn default_static_ttl_secs() -> u64 {
    7 * 24 * 3_600
}

fn default_api_ttl_secs() -> u64 {
    5 * 60
}

fn default_images_ttl_secs() -> u64 {
    30 * 24 * 3_600
}

fn default_metrics_ttl_secs() -> u64 {
    60
}

fn default_pages_ttl_secs() -> u64 {
    24 * 3_600
}

fn default_precache_urls() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.webmanifest".into(), "/favicon.ico".into()]
}

fn default_offline_url() -> Option<String> {
    Some("/offline.html".into())
}

fn default_metrics_patterns() -> Vec<String> {
    vec![
        "^/rest/v1/rpc/get_dashboard_metrics".into(),
        "^/rest/v1/rpc/get_[a-z_]+_metrics".into(),
        "^/rest/v1/mv_".into(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_max_sync_attempts() -> u32 {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            in_memory: false,
            origin: default_origin(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            max_entry_bytes: default_max_entry_bytes(),
            cache_version: default_cache_version(),
            sweep_interval_secs: default_sweep_interval_secs(),
            static_ttl_secs: default_static_ttl_secs(),
            api_ttl_secs: default_api_ttl_secs(),
            images_ttl_secs: default_images_ttl_secs(),
            metrics_ttl_secs: default_metrics_ttl_secs(),
            pages_ttl_secs: default_pages_ttl_secs(),
            precache_urls: default_precache_urls(),
            offline_url: default_offline_url(),
            metrics_patterns: default_metrics_patterns(),
            background_sync: true,
            max_sync_attempts: default_max_sync_attempts(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Sweep interval as Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BEEKON_SW_`
    /// 2. TOML file from `BEEKON_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var_os("BEEKON_SW_CONFIG_FILE").map(PathBuf::from);
        Self::load_with_file(config_path.as_deref())
    }

    /// Like [`AppConfig::load`], with an explicit TOML file in place of
    /// `BEEKON_SW_CONFIG_FILE`.
    pub fn load_with_file(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_path) = config_path {
            figment = figment.merge(Toml::file(config_path));
        }

        figment = figment.merge(
            Env::prefixed("BEEKON_SW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./beekon-sw-cache.sqlite"));
        assert_eq!(config.user_agent, "beekon-sw/0.1");
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.cache_version, 1);
        assert_eq!(config.sweep_interval_secs, 3_600);
        assert_eq!(config.api_ttl_secs, 300);
        assert!(config.background_sync);
        assert!(!config.in_memory);
        assert_eq!(config.offline_url.as_deref(), Some("/offline.html"));
        assert!(!config.metrics_patterns.is_empty());
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
        assert_eq!(config.sweep_interval(), Duration::from_secs(3_600));
    }

    #[test]
    fn test_load_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BEEKON_SW_CACHE_VERSION", "7");
            jail.set_env("BEEKON_SW_API_TTL_SECS", "120");
            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache_version, 7);
            assert_eq!(config.api_ttl_secs, 120);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("sw.toml", "origin = \"https://app.beekon.ai\"\nin_memory = true\n")?;
            jail.set_env("BEEKON_SW_CONFIG_FILE", "sw.toml");
            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.origin, "https://app.beekon.ai");
            assert!(config.in_memory);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_and_invalid_value() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("explicit.toml", "cache_version = 4\napi_ttl_secs = 0\n")?;
            let err = AppConfig::load_with_file(Some(Path::new("explicit.toml"))).unwrap_err();
            assert!(err.to_string().contains("api_ttl_secs"));

            jail.create_file("ok.toml", "cache_version = 4\n")?;
            let config = AppConfig::load_with_file(Some(Path::new("ok.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.cache_version, 4);
            Ok(())
        });
    }
}
