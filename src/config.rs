//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dashboard::{DuplicatePolicy, ReconcilerOptions, DEFAULT_RETENTION_CAP};
use crate::feed::{BackoffPolicy, ManagerOptions};
use crate::protocol::ClientMessage;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub backoff: BackoffConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Feed connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Origin the dashboard was served from; the socket reuses its host
    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_origin() -> String {
    "http://localhost:8081".to_string()
}

fn default_path() -> String {
    crate::endpoint::DEFAULT_PATH.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_ping_interval() -> u64 {
    54
}

fn default_idle_timeout() -> u64 {
    60
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            path: default_path(),
            connect_timeout_secs: default_connect_timeout(),
            ping_interval_secs: default_ping_interval(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

/// Reconnect strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    #[default]
    Exponential,
    Fixed,
}

/// Reconnect backoff configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    #[serde(default)]
    pub strategy: BackoffStrategy,

    #[serde(default = "default_base_ms")]
    pub base_ms: u64,

    #[serde(default = "default_cap_ms")]
    pub cap_ms: u64,

    #[serde(default = "default_fixed_ms")]
    pub fixed_ms: u64,
}

fn default_base_ms() -> u64 {
    1000
}

fn default_cap_ms() -> u64 {
    30_000
}

fn default_fixed_ms() -> u64 {
    3000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            strategy: BackoffStrategy::default(),
            base_ms: default_base_ms(),
            cap_ms: default_cap_ms(),
            fixed_ms: default_fixed_ms(),
        }
    }
}

impl BackoffConfig {
    pub fn policy(&self) -> BackoffPolicy {
        match self.strategy {
            BackoffStrategy::Fixed => BackoffPolicy::Fixed(Duration::from_millis(self.fixed_ms)),
            BackoffStrategy::Exponential => BackoffPolicy::Exponential {
                base: Duration::from_millis(self.base_ms),
                cap: Duration::from_millis(self.cap_ms),
            },
        }
    }
}

/// Dashboard state configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_retention_cap")]
    pub retention_cap: usize,

    #[serde(default)]
    pub duplicates: DuplicatePolicy,

    /// Series registered at startup and subscribed on every connect
    #[serde(default)]
    pub series: Vec<String>,
}

fn default_retention_cap() -> usize {
    DEFAULT_RETENTION_CAP
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            retention_cap: default_retention_cap(),
            duplicates: DuplicatePolicy::default(),
            series: Vec::new(),
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

    pub file: Option<String>,
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
            file: None,
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

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
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
            dirs::config_dir().map(|p| p.join("chartfeed").join("config.toml")),
            Some(PathBuf::from("/etc/chartfeed/config.toml")),
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

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(origin) = lookup("CHARTFEED_ORIGIN") {
            self.connection.origin = origin;
        }
        if let Some(path) = lookup("CHARTFEED_PATH") {
            self.connection.path = path;
        }
        if let Some(cap) = lookup("CHARTFEED_RETENTION") {
            match cap.parse() {
                Ok(cap) => self.dashboard.retention_cap = cap,
                Err(_) => tracing::warn!(value = %cap, "Ignoring non-numeric CHARTFEED_RETENTION"),
            }
        }
        if let Some(level) = lookup("CHARTFEED_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CHARTFEED_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dashboard.retention_cap == 0 {
            return Err(ConfigError::Invalid(
                "dashboard.retention_cap must be at least 1".to_string(),
            ));
        }
        if self.connection.connect_timeout_secs == 0
            || self.connection.ping_interval_secs == 0
            || self.connection.idle_timeout_secs == 0
        {
            return Err(ConfigError::Invalid(
                "connection intervals must be greater than zero".to_string(),
            ));
        }
        if self.connection.ping_interval_secs >= self.connection.idle_timeout_secs {
            return Err(ConfigError::Invalid(format!(
                "ping interval ({}s) must be shorter than the idle timeout ({}s)",
                self.connection.ping_interval_secs, self.connection.idle_timeout_secs
            )));
        }
        if self.backoff.strategy == BackoffStrategy::Exponential && self.backoff.base_ms > self.backoff.cap_ms {
            return Err(ConfigError::Invalid(format!(
                "backoff base ({}ms) exceeds cap ({}ms)",
                self.backoff.base_ms, self.backoff.cap_ms
            )));
        }
        if self.dashboard.series.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "dashboard.series contains an empty name".to_string(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::Invalid(format!(
                "unknown log format {:?} (expected pretty or json)",
                self.logging.format
            )));
        }
        Ok(())
    }

    pub fn reconciler_options(&self) -> ReconcilerOptions {
        ReconcilerOptions {
            retention_cap: self.dashboard.retention_cap,
            duplicates: self.dashboard.duplicates,
        }
    }

    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            backoff: self.backoff.policy(),
            connect_timeout: Duration::from_secs(self.connection.connect_timeout_secs),
            ping_interval: Duration::from_secs(self.connection.ping_interval_secs),
            idle_timeout: Duration::from_secs(self.connection.idle_timeout_secs),
            subscriptions: ClientMessage::subscriptions_for(self.dashboard.series.iter().cloned()),
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
    r#"# chartfeed configuration
#
# Environment variables override these settings:
# - CHARTFEED_ORIGIN
# - CHARTFEED_PATH
# - CHARTFEED_RETENTION
# - CHARTFEED_LOG_LEVEL
# - CHARTFEED_LOG_FORMAT

[connection]
# Origin the dashboard is served from (http -> ws, https -> wss)
origin = "http://localhost:8081"

# Socket path on that origin
path = "/ws"

# Give up on a connect or handshake after this long (seconds)
connect_timeout_secs = 10

# Ping the server this often (seconds)
ping_interval_secs = 54

# Reconnect when nothing arrives for this long (seconds)
idle_timeout_secs = 60

[backoff]
# exponential: base_ms doubling up to cap_ms; fixed: fixed_ms every time
strategy = "exponential"
base_ms = 1000
cap_ms = 30000
fixed_ms = 3000

[dashboard]
# Points kept per series; oldest are evicted first
retention_cap = 150

# Repeated (t, v) points: keep or drop
duplicates = "keep"

# Series to show before the first data arrives
series = []

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/chartfeed/chartfeed.log"
"#
    .to_string()
}
