//! Application state for the commerce rule engine API.

use std::sync::Arc;

use crate::config::ServiceMetadata;
use crate::store::RuleStore;

/// Shared application state.
///
/// Holds the rule store every handler reads and writes, plus the service
/// metadata reported by the health endpoint.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn RuleStore>,
    service: Arc<ServiceMetadata>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(store: Arc<dyn RuleStore>, service: ServiceMetadata) -> Self {
        Self {
            store,
            service: Arc::new(service),
        }
    }

    /// Returns a shared handle to the rule store, for work moved off the
    /// request task.
    pub fn store_handle(&self) -> Arc<dyn RuleStore> {
        Arc::clone(&self.store)
    }

    /// Returns the service metadata.
    pub fn service(&self) -> &ServiceMetadata {
        &self.service
    }
}
