//! Engine configuration
//!
//! JSON file; every field is optional:
//!
//! ```json
//! {
//!   "catalog_path": "catalog.json",
//!   "data_path": "data.json",
//!   "acl_path": "grants.json",
//!   "log_level": "info",
//!   "plan_cache_capacity": 64,
//!   "max_page_size": 1000
//! }
//! ```
//!
//! Without `catalog_path` the built-in test management catalog is used.
//! The plan cache is off unless `plan_cache_capacity` is above zero.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Severity};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_max_page_size() -> usize {
    1000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Catalog file; `None` selects the built-in catalog
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Data file for the in-memory backend
    #[serde(default)]
    pub data_path: Option<PathBuf>,

    /// Read grants per login
    #[serde(default)]
    pub acl_path: Option<PathBuf>,

    #[serde(default)]
    pub log_level: Severity,

    /// Cached plans; 0 disables the cache
    #[serde(default)]
    pub plan_cache_capacity: usize,

    /// Requested page sizes above this are clamped
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            data_path: None,
            acl_path: None,
            log_level: Severity::default(),
            plan_cache_capacity: 0,
            max_page_size: default_max_page_size(),
        }
    }
}

impl EngineConfig {
    /// Loads and validates a config file. Relative paths inside it are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&content)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }

        let source = path.display().to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("source", source.as_str()),
                ("log_level", config.log_level.as_str()),
            ],
        );
        Ok(config)
    }

    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be > 0".into()));
        }
        Ok(())
    }

    fn rebase(&mut self, base: &Path) {
        for path in [&mut self.catalog_path, &mut self.data_path, &mut self.acl_path]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn plan_cache_enabled(&self) -> bool {
        self.plan_cache_capacity > 0
    }
}
