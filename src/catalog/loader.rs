//! Catalog loader for reading a column catalog from disk at startup
//!
//! A catalog file is one JSON document:
//!
//! ```json
//! {
//!   "entities":  [{"name": "Campaign"}, {"name": "Iteration"}],
//!   "relations": [{"from": "Campaign", "from_field": "id",
//!                  "to": "Iteration", "to_field": "campaign_id",
//!                  "cardinality": "one_to_many"}],
//!   "columns":   [{"label": "CAMPAIGN_ID", "entity": "Campaign",
//!                  "attribute": "id", "kind": "id"}]
//! }
//! ```
//!
//! Any failure is FATAL: the process must not start with a partial catalog.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::registry::{CatalogBuilder, ColumnCatalog};
use super::errors::{CatalogError, CatalogResult};
use super::types::{ColumnPrototype, EntityDef, Relation};
use crate::observability::{log_event_with_fields, Event};

/// On-disk catalog document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    #[serde(default)]
    pub columns: Vec<ColumnPrototype>,
}

impl CatalogFile {
    /// Captures a built catalog back into its file form
    pub fn from_catalog(catalog: &ColumnCatalog) -> Self {
        Self {
            entities: catalog.graph().entities().cloned().collect(),
            relations: catalog.graph().relations().to_vec(),
            columns: catalog.columns().cloned().collect(),
        }
    }

    fn into_builder(self) -> CatalogBuilder {
        let mut builder = CatalogBuilder::new();
        for entity in self.entities {
            builder = builder.entity_def(entity);
        }
        for relation in self.relations {
            builder = builder.relation(relation);
        }
        for column in self.columns {
            builder = builder.column(column);
        }
        builder
    }
}

/// Reads catalog files
pub struct CatalogLoader;

impl CatalogLoader {
    /// Loads and validates a catalog file
    pub fn load(path: &Path) -> CatalogResult<ColumnCatalog> {
        let source = path.display().to_string();
        let result = fs::read_to_string(path)
            .map_err(|e| CatalogError::malformed(&source, format!("Failed to read file: {}", e)))
            .and_then(|content| Self::from_json(&source, &content));

        match &result {
            Ok(catalog) => {
                let columns = catalog.len().to_string();
                log_event_with_fields(
                    Event::CatalogLoaded,
                    &[("source", source.as_str()), ("columns", columns.as_str())],
                );
            }
            Err(err) => {
                log_event_with_fields(
                    Event::CatalogLoadFailed,
                    &[("source", source.as_str()), ("code", err.code().code())],
                );
            }
        }
        result
    }

    /// Parses and validates a catalog document
    pub fn from_json(source: &str, content: &str) -> CatalogResult<ColumnCatalog> {
        let file: CatalogFile = serde_json::from_str(content)
            .map_err(|e| CatalogError::malformed(source, format!("Invalid JSON: {}", e)))?;
        file.into_builder().build()
    }

    /// Writes a catalog file
    pub fn save(catalog: &ColumnCatalog, path: &Path) -> CatalogResult<()> {
        let source = path.display().to_string();
        let json = serde_json::to_string_pretty(&CatalogFile::from_catalog(catalog))
            .map_err(|e| CatalogError::malformed(&source, e.to_string()))?;
        fs::write(path, json)
            .map_err(|e| CatalogError::malformed(&source, format!("Failed to write file: {}", e)))
    }
}
