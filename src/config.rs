//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `KEYVIZ_*` environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ApiConfig;
use crate::collector::pd::PdConfig;
use crate::collector::tidb::TidbConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub pd: PdSection,

    #[serde(default)]
    pub tidb: TidbSection,

    #[serde(default)]
    pub collector: CollectorConfig,

    #[serde(default)]
    pub heatmap: HeatmapConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Placement driver connection
#[derive(Debug, Clone, Deserialize)]
pub struct PdSection {
    #[serde(default = "default_pd_url")]
    pub url: String,

    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    #[serde(default = "default_upstream_timeout")]
    pub request_timeout_ms: u64,
}

fn default_pd_url() -> String {
    "http://127.0.0.1:2379".to_string()
}

fn default_page_limit() -> usize {
    1024
}

fn default_upstream_timeout() -> u64 {
    5000
}

impl Default for PdSection {
    fn default() -> Self {
        Self {
            url: default_pd_url(),
            page_limit: default_page_limit(),
            request_timeout_ms: default_upstream_timeout(),
        }
    }
}

/// TiDB status server connection, used for the table catalog
#[derive(Debug, Clone, Deserialize)]
pub struct TidbSection {
    #[serde(default = "default_tidb_url")]
    pub url: String,

    #[serde(default = "default_tidb_enabled")]
    pub enabled: bool,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_upstream_timeout")]
    pub request_timeout_ms: u64,
}

fn default_tidb_url() -> String {
    "http://127.0.0.1:10080".to_string()
}

fn default_tidb_enabled() -> bool {
    true
}

fn default_refresh_interval() -> u64 {
    60
}

impl Default for TidbSection {
    fn default() -> Self {
        Self {
            url: default_tidb_url(),
            enabled: default_tidb_enabled(),
            refresh_interval_secs: default_refresh_interval(),
            request_timeout_ms: default_upstream_timeout(),
        }
    }
}

/// Sampling loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_interval() -> u64 {
    60
}

fn default_history_capacity() -> usize {
    1024
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            history_capacity: default_history_capacity(),
        }
    }
}

/// Heatmap rendering configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HeatmapConfig {
    #[serde(default = "default_max_buckets")]
    pub max_buckets: usize,
}

fn default_max_buckets() -> usize {
    crate::keyspace::DEFAULT_MAX_BUCKETS
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            max_buckets: default_max_buckets(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("keyviz").join("config.toml")),
            Some(PathBuf::from("/etc/keyviz/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Reject settings the collector or heatmap pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collector.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "collector.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.collector.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "collector.history_capacity must be greater than zero".to_string(),
            ));
        }
        if self.heatmap.max_buckets == 0 {
            return Err(ConfigError::Invalid(
                "heatmap.max_buckets must be greater than zero".to_string(),
            ));
        }
        if self.pd.page_limit == 0 {
            return Err(ConfigError::Invalid(
                "pd.page_limit must be greater than zero".to_string(),
            ));
        }
        if self.tidb.enabled && self.tidb.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "tidb.refresh_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Sampling interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.collector.interval_secs)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            request_timeout_secs: self.server.request_timeout_secs,
        }
    }

    pub fn pd_config(&self) -> PdConfig {
        PdConfig {
            url: self.pd.url.clone(),
            page_limit: self.pd.page_limit,
            request_timeout_ms: self.pd.request_timeout_ms,
        }
    }

    pub fn tidb_config(&self) -> TidbConfig {
        TidbConfig {
            url: self.tidb.url.clone(),
            request_timeout_ms: self.tidb.request_timeout_ms,
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("KEYVIZ_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("KEYVIZ_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = lookup("KEYVIZ_PD_URL") {
            self.pd.url = url;
        }
        if let Some(url) = lookup("KEYVIZ_TIDB_URL") {
            self.tidb.url = url;
        }
        if let Some(secs) = lookup("KEYVIZ_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.collector.interval_secs = secs;
        }
        if let Some(buckets) = lookup("KEYVIZ_MAX_BUCKETS").and_then(|v| v.parse().ok()) {
            self.heatmap.max_buckets = buckets;
        }
        if let Some(capacity) = lookup("KEYVIZ_HISTORY_CAPACITY").and_then(|v| v.parse().ok()) {
            self.collector.history_capacity = capacity;
        }
        if let Some(level) = lookup("KEYVIZ_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("KEYVIZ_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Key Visualizer Configuration
#
# Environment variables override these settings:
# - KEYVIZ_HOST
# - KEYVIZ_PORT
# - KEYVIZ_PD_URL
# - KEYVIZ_TIDB_URL
# - KEYVIZ_INTERVAL_SECS
# - KEYVIZ_MAX_BUCKETS
# - KEYVIZ_HISTORY_CAPACITY
# - KEYVIZ_LOG_LEVEL
# - KEYVIZ_LOG_FORMAT

[server]
# HTTP server host
host = "0.0.0.0"

# HTTP server port
port = 8000

# Request timeout in seconds
request_timeout_secs = 30

[pd]
# Placement driver URL, source of region statistics
url = "http://127.0.0.1:2379"

# Regions fetched per page
page_limit = 1024

# Upstream request timeout (ms)
request_timeout_ms = 5000

[tidb]
# TiDB status server URL, source of the table catalog
url = "http://127.0.0.1:10080"

# Disable to serve only unscoped keyspace heatmaps
enabled = true

# How often to reload the table catalog (seconds)
refresh_interval_secs = 60

# Upstream request timeout (ms)
request_timeout_ms = 5000

[collector]
# Sampling interval (seconds)
interval_secs = 60

# Snapshots kept in memory; older ones are evicted
history_capacity = 1024

[heatmap]
# Maximum key buckets per heatmap
max_buckets = 256

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
