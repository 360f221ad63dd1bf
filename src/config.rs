//! Configuration management for the traffic router

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Shortest counter lifetime that still covers a whole UTC day.
pub const MIN_QUOTA_TTL_SECONDS: u64 = 86_400;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Where targets and quota counters live
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Redis,
    /// Process-local maps; counters are not shared between instances
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

/// How the daily cap is enforced under concurrent routing
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuotaEnforcement {
    /// Read the counter, then increment the winner. Concurrent requests may overshoot.
    Soft,
    /// Increment first and undo on overflow, so the cap is never exceeded.
    Strict,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QuotaConfig {
    pub ttl_seconds: u64,
    pub enforcement: QuotaEnforcement,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    /// Directory for a daily rolling log file, stdout only when unset
    pub directory: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (e.g. TRAFFIC_ROUTER__QUOTA__ENFORCEMENT=strict)
            .add_source(
                Environment::with_prefix("TRAFFIC_ROUTER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            // Override Redis URL from REDIS_URL env var if present
            .set_override_option("redis.url", env::var("REDIS_URL").ok())?
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.quota.ttl_seconds < MIN_QUOTA_TTL_SECONDS {
            return Err(ConfigError::Message(format!(
                "quota.ttl_seconds must be at least {}, got {}",
                MIN_QUOTA_TTL_SECONDS, self.quota.ttl_seconds
            )));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Redis,
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: MIN_QUOTA_TTL_SECONDS,
            enforcement: QuotaEnforcement::Soft,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}
