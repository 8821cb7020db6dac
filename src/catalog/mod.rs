//! Column prototype catalog
//!
//! - Registry of every queryable column, keyed by stable label
//! - Entity graph with relation cardinalities
//! - Loaded once at startup, immutable afterwards
//!
//! Loading failures are FATAL. Lookups of unknown labels are rejections.

pub mod builtin;
mod registry;
mod errors;
mod graph;
mod loader;
mod types;

pub use registry::{CatalogBuilder, ColumnCatalog};
pub use errors::{CatalogError, CatalogErrorCode, CatalogResult, Severity};
pub use graph::{EntityGraph, FanOutKey, JoinPath, JoinStep};
pub use loader::{CatalogFile, CatalogLoader};
pub use types::{
    Cardinality, ColumnPrototype, ColumnRole, DataKind, EntityDef, EntityId, EntityType, Relation,
};
