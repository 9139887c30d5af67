//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading rate tables
//! from a YAML file into an immutable [`RateTableConfig`] snapshot.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{EngineError, EngineResult};

use super::types::RateTableConfig;

/// Loads and provides access to a rate table snapshot.
///
/// The loader only reads. Editing, persisting and inheriting rate tables
/// between scopes is left to whoever produces the YAML file.
///
/// # Example
///
/// ```no_run
/// use mortgage_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/rate_tables.yaml")?;
/// let fha = loader.config().fha()?;
/// println!("FHA upfront MIP: {}%", fha.upfront_mip_rate);
/// # Ok::<(), mortgage_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: RateTableConfig,
}

impl ConfigLoader {
    /// Loads rate tables from the specified YAML file.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - The file is missing (`ConfigNotFound`)
    /// - The file contains invalid YAML or a malformed tier schedule (`ConfigParseError`)
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        let loader = Self::parse(&content, &path_str)?;
        debug!(path = %path_str, "Loaded rate tables");
        Ok(loader)
    }

    /// Parses rate tables from a YAML string.
    ///
    /// # Example
    ///
    /// ```
    /// use mortgage_engine::config::ConfigLoader;
    ///
    /// let yaml = r#"
    /// usda:
    ///   upfront_fee_rate: 1.0
    ///   annual_fee_rate: 0.35
    /// "#;
    /// let loader = ConfigLoader::from_yaml_str(yaml).unwrap();
    /// assert!(loader.config().usda().is_ok());
    /// assert!(loader.config().fha().is_err());
    /// ```
    pub fn from_yaml_str(yaml: &str) -> EngineResult<Self> {
        Self::parse(yaml, "<inline>")
    }

    fn parse(content: &str, source: &str) -> EngineResult<Self> {
        let config: RateTableConfig =
            serde_yaml::from_str(content).map_err(|e| EngineError::ConfigParseError {
                path: source.to_string(),
                message: e.to_string(),
            })?;

        config
            .check_tier_schedules()
            .map_err(|message| EngineError::ConfigParseError {
                path: source.to_string(),
                message,
            })?;

        Ok(Self { config })
    }

    /// Returns the loaded rate tables.
    pub fn config(&self) -> &RateTableConfig {
        &self.config
    }

    /// Consumes the loader, returning the rate tables.
    pub fn into_config(self) -> RateTableConfig {
        self.config
    }
}
