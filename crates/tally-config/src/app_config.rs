//! Application configuration structures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Cache store configuration.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppMetadata::default(),
            cache: CacheConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "tally-transaction".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Cache store (Redis) configuration.
///
/// Immutable for the process lifetime once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Connection protocol. Only "tcp" is supported.
    pub protocol: String,
    /// Store host. Required.
    pub host: String,
    /// Store port. Required.
    pub port: u16,
    /// Username for ACL authentication (empty = none).
    pub username: String,
    /// Password (empty = none).
    pub password: String,
    /// Expiry applied when a caller requests a zero TTL. Must be positive.
    pub default_ttl_secs: u64,
    /// TLS settings.
    #[serde(default)]
    pub tls: TlsConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            protocol: "tcp".to_string(),
            host: "localhost".to_string(),
            port: 6379,
            username: String::new(),
            password: String::new(),
            default_ttl_secs: 300, // 5 minutes
            tls: TlsConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Returns the store address as host:port.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the default TTL as a Duration.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

/// TLS settings for the cache connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Enable TLS.
    pub enabled: bool,
    /// Skip server certificate verification.
    pub insecure_skip_verify: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json, pretty).
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}
