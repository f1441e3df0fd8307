// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the pingback receiver.
//!
//! Values come from an optional TOML file overlaid by `PINGBACK_*`
//! environment variables (e.g. `PINGBACK_PINGBACK__ENABLED=false`).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the pingback receiver service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Storage configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Pingback processing configuration
    #[serde(default)]
    pub pingback: PingbackConfig,

    /// Acceptance notification configuration
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// SurrealDB connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `memory` or a RocksDB directory (requires the `rocksdb` feature)
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_database")]
    pub database: String,
}

/// Pingback receiving and source examination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingbackConfig {
    /// Accept pingbacks at all (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on fetching a source document, in seconds (default: 30)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// User-Agent sent when fetching source documents
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Bytes of a source document examined; the rest is ignored (default: 1 MiB)
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,
}

/// Where to announce accepted pingbacks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Webhook receiving each accepted record as JSON
    #[serde(default)]
    pub webhook_url: Option<String>,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_db_path() -> String {
    "memory".to_string()
}

fn default_namespace() -> String {
    "pingback".to_string()
}

fn default_database() -> String {
    "blog".to_string()
}

fn default_true() -> bool {
    true
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("pingback-receiver/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_source_bytes() -> usize {
    1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            database: DatabaseConfig::default(),
            pingback: PingbackConfig::default(),
            notification: NotificationConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            namespace: default_namespace(),
            database: default_database(),
        }
    }
}

impl Default for PingbackConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
            max_source_bytes: default_max_source_bytes(),
        }
    }
}

impl PingbackConfig {
    /// Get the source fetch timeout
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Config {
    /// Load configuration from `file` (if it exists) and the environment.
    pub fn load(file: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix("PINGBACK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.database.path, "memory");
        assert!(config.pingback.enabled);
        assert_eq!(config.pingback.fetch_timeout(), Duration::from_secs(30));
        assert!(config.notification.webhook_url.is_none());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = Config::load("does-not-exist.toml").unwrap();
        assert_eq!(config.pingback.fetch_timeout_secs, 30);
        assert_eq!(config.database.namespace, "pingback");
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"pingback": {"enabled": false}}"#).unwrap();
        assert!(!config.pingback.enabled);
        assert_eq!(config.pingback.max_source_bytes, 1024 * 1024);
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }
}
