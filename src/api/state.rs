//! Application state for the mortgage calculation API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::sync::Arc;

use crate::config::{ConfigLoader, RateTableConfig};

/// Shared application state.
///
/// Holds the rate tables behind an `Arc`. Each request takes one snapshot
/// and uses it for the whole calculation.
#[derive(Clone)]
pub struct AppState {
    /// The loaded rate tables.
    config: Arc<RateTableConfig>,
}

impl AppState {
    /// Creates a new application state from loaded rate tables.
    pub fn new(config: RateTableConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new application state from a configuration loader.
    pub fn from_loader(loader: ConfigLoader) -> Self {
        Self::new(loader.into_config())
    }

    /// Returns a snapshot of the rate tables for one request.
    pub fn snapshot(&self) -> Arc<RateTableConfig> {
        Arc::clone(&self.config)
    }
}
