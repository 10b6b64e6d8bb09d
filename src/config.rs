//! Configuration management for Tollgate.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TollgateError};
use crate::ratelimit::{BucketConfig, LimitScope};

/// Prefix for environment overrides, e.g. `TOLLGATE__RATE_LIMITING__CAPACITY=8`.
pub const ENV_PREFIX: &str = "TOLLGATE";

/// Main configuration for the Tollgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TollgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8081))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Per-client or global buckets
    #[serde(default)]
    pub scope: LimitScope,

    /// Burst size
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Sustained rate in tokens per second
    #[serde(default = "default_refill_rate")]
    pub refill_rate_per_second: f64,

    /// How often idle clients are swept, in seconds
    #[serde(default = "default_reclaim_interval")]
    pub reclaim_interval_secs: u64,

    /// Idle time after which a client is forgotten, in seconds
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            scope: LimitScope::default(),
            capacity: default_capacity(),
            refill_rate_per_second: default_refill_rate(),
            reclaim_interval_secs: default_reclaim_interval(),
            idle_threshold_secs: default_idle_threshold(),
        }
    }
}

fn default_capacity() -> u32 {
    4
}

fn default_refill_rate() -> f64 {
    2.0
}

fn default_reclaim_interval() -> u64 {
    60
}

fn default_idle_threshold() -> u64 {
    180
}

impl RateLimitingConfig {
    /// The validated bucket parameters.
    pub fn bucket(&self) -> Result<BucketConfig> {
        BucketConfig::new(self.capacity, self.refill_rate_per_second)
    }

    pub fn reclaim_interval(&self) -> Duration {
        Duration::from_secs(self.reclaim_interval_secs)
    }

    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TollgateConfig {
    /// Load configuration from an optional file, then apply environment overrides.
    ///
    /// The file format is taken from its extension (YAML, TOML or JSON).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let config: TollgateConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        let rl = &self.rate_limiting;
        rl.bucket()?;

        if rl.reclaim_interval_secs == 0 {
            return Err(TollgateError::Config(
                "reclaim_interval_secs must be greater than zero".to_string(),
            ));
        }
        if rl.idle_threshold_secs <= rl.reclaim_interval_secs {
            return Err(TollgateError::Config(format!(
                "idle_threshold_secs ({}) must be greater than reclaim_interval_secs ({})",
                rl.idle_threshold_secs, rl.reclaim_interval_secs
            )));
        }
        Ok(())
    }
}
