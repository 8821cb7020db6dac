//! Scope resolution
//!
//! A scope is a list of entity references restricting what a query may see.
//! Resolution expands containers, drops stale references and filters leaves
//! through the permission oracle.

mod directory;
mod permission;
mod resolver;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{EntityId, EntityType};

pub use directory::{DirectoryEntry, EntityDirectory};
pub use permission::{AclGrants, AclRegistry, AclSnapshot, Identity, PermissionOracle};
pub use resolver::ScopeResolver;

/// Reference to one entity, leaf or container
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityReference {
    pub entity_type: EntityType,
    pub id: EntityId,
}

impl EntityReference {
    pub fn new(entity_type: impl Into<EntityType>, id: EntityId) -> Self {
        Self {
            entity_type: entity_type.into(),
            id,
        }
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.entity_type, self.id)
    }
}

/// Effective working set of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedScope {
    /// No restriction, no permission filtering
    Unrestricted,
    /// Readable leaf ids, partitioned by entity type
    Restricted(BTreeMap<EntityType, BTreeSet<EntityId>>),
}

impl ResolvedScope {
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, ResolvedScope::Unrestricted)
    }

    /// Number of leaves in a restricted scope (0 when unrestricted)
    pub fn leaf_count(&self) -> usize {
        match self {
            ResolvedScope::Unrestricted => 0,
            ResolvedScope::Restricted(partitions) => partitions.values().map(BTreeSet::len).sum(),
        }
    }

    pub fn ids(&self, entity_type: &EntityType) -> Option<&BTreeSet<EntityId>> {
        match self {
            ResolvedScope::Unrestricted => None,
            ResolvedScope::Restricted(partitions) => partitions.get(entity_type),
        }
    }
}
