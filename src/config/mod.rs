//! Configuration loading for the commerce rule engine.
//!
//! The engine is configured by a single `engine.yaml` naming the service,
//! the HTTP bind address, the default log filter and the rule store backend.
//!
//! # Example
//!
//! ```no_run
//! use commerce_rules::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config").unwrap();
//! println!("Loaded service: {}", config.config().service.name);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{EngineConfig, LoggingConfig, ServerConfig, ServiceMetadata, StoreConfig};
