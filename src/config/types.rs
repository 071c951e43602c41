//! Configuration types for the engine.
//!
//! These structures are deserialized from `engine.yaml`.

use std::path::PathBuf;

use serde::Deserialize;

/// Metadata identifying the running service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceMetadata {
    /// Service name, reported by the health endpoint.
    pub name: String,
    /// Deployed version label.
    #[serde(default = "default_version")]
    pub version: String,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. `127.0.0.1:8080`.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

/// Which rule store backend to use.
///
/// Relative paths are resolved against the configuration directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// One YAML file per rule type in a directory.
    Yaml {
        /// Directory holding `<rule_type>.yaml` files.
        rules_dir: PathBuf,
    },
    /// A SQLite database file.
    Sqlite {
        /// Path of the database file. Created if missing.
        path: PathBuf,
    },
    /// An empty in-memory store, populated through the admin API.
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Yaml {
            rules_dir: PathBuf::from("rules"),
        }
    }
}

/// The complete engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Service metadata.
    pub service: ServiceMetadata,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Rule store backend.
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_log_filter() -> String {
    "commerce_rules=info".to_string()
}
