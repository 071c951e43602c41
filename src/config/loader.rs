//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the engine
//! configuration from YAML and building the configured rule store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::store::{InMemoryRuleStore, RuleStore, SqliteRuleStore, YamlRuleStore};

use super::types::{EngineConfig, StoreConfig};

/// Loads and provides access to the engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/
/// ├── engine.yaml              # Service, server, logging and store settings
/// └── rules/                   # Rule files for the yaml backend
///     ├── pricing_display.yaml
///     ├── rush_surcharge.yaml
///     └── collection_pricing.yaml
/// ```
///
/// # Example
///
/// ```no_run
/// use commerce_rules::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config")?;
/// let store = loader.build_store()?;
/// println!("Serving {} on {}", loader.config().service.name, loader.config().server.bind_address);
/// # Ok::<(), commerce_rules::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_dir: PathBuf,
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads `engine.yaml` from the specified directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound` if the file is missing and
    /// `ConfigParseError` if it is not valid YAML for [`EngineConfig`].
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let base_dir = path.as_ref().to_path_buf();
        let config = Self::load_yaml::<EngineConfig>(&base_dir.join("engine.yaml"))?;
        Ok(Self { base_dir, config })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolves a configured path against the configuration directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Builds the configured rule store.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if a SQLite database cannot be opened.
    /// A YAML rules directory is not checked here; a missing directory
    /// surfaces on the first load.
    pub fn build_store(&self) -> EngineResult<Arc<dyn RuleStore>> {
        let store: Arc<dyn RuleStore> = match &self.config.store {
            StoreConfig::Yaml { rules_dir } => {
                let dir = self.resolve_path(rules_dir);
                info!(rules_dir = %dir.display(), "Using YAML rule store");
                Arc::new(YamlRuleStore::new(dir))
            }
            StoreConfig::Sqlite { path } => {
                let path = self.resolve_path(path);
                info!(path = %path.display(), "Using SQLite rule store");
                Arc::new(SqliteRuleStore::open(path)?)
            }
            StoreConfig::Memory => {
                info!("Using in-memory rule store");
                Arc::new(InMemoryRuleStore::new())
            }
        };
        Ok(store)
    }
}
