//! In-memory storage backend
//!
//! Holds rows per entity type plus container membership. Serves both as a
//! [`StorageBackend`] for compiled plans and as the [`EntityDirectory`]
//! used during scope resolution.
//!
//! Data file format:
//!
//! ```json
//! {
//!   "tables": { "TestCase": [ { "id": 1, "name": "login" } ] },
//!   "containers": [
//!     { "entity_type": "Folder", "id": 1,
//!       "children": [ { "entity_type": "TestCase", "id": 1 } ] }
//!   ],
//!   "primary_keys": { "TestCase": "id" }
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::backend::StorageBackend;
use super::errors::{StorageError, StorageResult};
use super::executor::{PlanEvaluator, Row, Tables};
use super::filters::{SpecialOperation, SpecialOperations};
use super::result::ResultSet;
use crate::catalog::{EntityId, EntityType};
use crate::model::Paging;
use crate::planner::Plan;
use crate::scope::{DirectoryEntry, EntityDirectory, EntityReference};

const DEFAULT_PRIMARY_KEY: &str = "id";

#[derive(Debug, Deserialize)]
struct ContainerFile {
    entity_type: EntityType,
    id: EntityId,
    #[serde(default)]
    children: Vec<EntityReference>,
}

#[derive(Debug, Default, Deserialize)]
struct DataFile {
    #[serde(default)]
    tables: HashMap<EntityType, Vec<Value>>,
    #[serde(default)]
    containers: Vec<ContainerFile>,
    #[serde(default)]
    primary_keys: HashMap<EntityType, String>,
}

/// Rows and containers kept in memory
#[derive(Default)]
pub struct MemoryStore {
    tables: Tables,
    primary_keys: HashMap<EntityType, String>,
    containers: HashMap<EntityReference, Vec<EntityReference>>,
    specials: SpecialOperations,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the primary key attribute of an entity (default `id`)
    pub fn with_primary_key(mut self, entity: impl Into<EntityType>, attribute: impl Into<String>) -> Self {
        self.primary_keys.insert(entity.into(), attribute.into());
        self
    }

    /// Adds one row; the value must be a JSON object
    pub fn insert(&mut self, entity: impl Into<EntityType>, row: Value) -> StorageResult<()> {
        let entity = entity.into();
        match row {
            Value::Object(map) => {
                self.tables.entry(entity).or_default().push(map);
                Ok(())
            }
            other => Err(StorageError::invalid_data(format!(
                "Row for {} must be an object, got {}",
                entity, other
            ))),
        }
    }

    /// Declares a container and its direct children
    pub fn add_container(&mut self, container: EntityReference, children: Vec<EntityReference>) {
        self.containers.entry(container).or_default().extend(children);
    }

    pub fn register_special(&mut self, name: impl Into<String>, operation: impl SpecialOperation + 'static) {
        self.specials.register(name, operation);
    }

    pub fn rows(&self, entity: &EntityType) -> &[Row] {
        self.tables.get(entity).map_or(&[][..], Vec::as_slice)
    }

    pub fn from_json(text: &str) -> StorageResult<Self> {
        let data: DataFile = serde_json::from_str(text)
            .map_err(|e| StorageError::invalid_data(format!("Malformed data file: {}", e)))?;

        let mut store = Self::new();
        for (entity, key) in data.primary_keys {
            store.primary_keys.insert(entity, key);
        }
        for (entity, rows) in data.tables {
            for row in rows {
                store.insert(entity.clone(), row)?;
            }
        }
        for container in data.containers {
            store.add_container(
                EntityReference::new(container.entity_type, container.id),
                container.children,
            );
        }
        Ok(store)
    }

    pub fn load(path: &Path) -> StorageResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            StorageError::unavailable(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    fn primary_key(&self, entity: &EntityType) -> &str {
        self.primary_keys
            .get(entity)
            .map_or(DEFAULT_PRIMARY_KEY, String::as_str)
    }
}

impl StorageBackend for MemoryStore {
    fn run(&self, plan: &Plan, paging: Option<&Paging>) -> StorageResult<ResultSet> {
        let tuples = PlanEvaluator::new(&self.tables, &self.specials).evaluate(plan)?;
        Ok(ResultSet::new(plan.column_names(), tuples).paged(paging))
    }
}

impl EntityDirectory for MemoryStore {
    fn lookup(&self, reference: &EntityReference) -> Option<DirectoryEntry> {
        if let Some(children) = self.containers.get(reference) {
            return Some(DirectoryEntry::Container(children.clone()));
        }
        let key = self.primary_key(&reference.entity_type);
        self.rows(&reference.entity_type)
            .iter()
            .any(|row| row.get(key).and_then(Value::as_i64) == Some(reference.id))
            .then_some(DirectoryEntry::Leaf)
    }
}
