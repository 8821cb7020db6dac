//! Read-permission oracle
//!
//! The resolver asks one question per scoped leaf: may this caller read it?
//! `AclRegistry` answers from an immutable snapshot of grants. A refresh
//! builds a new snapshot and swaps the `Arc`; a check clones the `Arc` once,
//! so every decision is taken against exactly one epoch.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::catalog::{EntityId, EntityType};
use crate::observability::{log_event_with_fields, Event};

/// Caller identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Identity {
    pub login: String,
    /// Informational to the oracle; the resolver never bypasses checks
    #[serde(default)]
    pub administrator: bool,
}

impl Identity {
    pub fn user(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            administrator: false,
        }
    }

    pub fn administrator(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            administrator: true,
        }
    }
}

/// Read-only permission oracle
pub trait PermissionOracle: Send + Sync {
    fn can_read(&self, caller: &Identity, entity_type: &EntityType, id: EntityId) -> bool;
}

impl<P: PermissionOracle + ?Sized> PermissionOracle for Arc<P> {
    fn can_read(&self, caller: &Identity, entity_type: &EntityType, id: EntityId) -> bool {
        (**self).can_read(caller, entity_type, id)
    }
}

/// Read grants per login
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AclGrants(BTreeMap<String, BTreeMap<EntityType, BTreeSet<EntityId>>>);

impl AclGrants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, login: impl Into<String>, entity_type: impl Into<EntityType>, id: EntityId) -> Self {
        self.0
            .entry(login.into())
            .or_default()
            .entry(entity_type.into())
            .or_default()
            .insert(id);
        self
    }

    fn allows(&self, login: &str, entity_type: &EntityType, id: EntityId) -> bool {
        self.0
            .get(login)
            .and_then(|by_type| by_type.get(entity_type))
            .map_or(false, |ids| ids.contains(&id))
    }
}

/// Grants frozen at one refresh epoch
#[derive(Debug, Default)]
pub struct AclSnapshot {
    epoch: u64,
    grants: AclGrants,
}

impl AclSnapshot {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Administrators read everything; other callers need an explicit grant.
    pub fn can_read(&self, caller: &Identity, entity_type: &EntityType, id: EntityId) -> bool {
        caller.administrator || self.grants.allows(&caller.login, entity_type, id)
    }
}

/// Refreshable, snapshot-based permission oracle
#[derive(Debug, Default)]
pub struct AclRegistry {
    current: RwLock<Arc<AclSnapshot>>,
}

impl AclRegistry {
    pub fn new(grants: AclGrants) -> Self {
        Self {
            current: RwLock::new(Arc::new(AclSnapshot { epoch: 0, grants })),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<AclSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.snapshot().epoch
    }

    /// Replaces all grants. In-flight checks finish on the snapshot they
    /// already hold. Returns the new epoch.
    pub fn refresh_acls(&self, grants: AclGrants) -> u64 {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let epoch = guard.epoch + 1;
        *guard = Arc::new(AclSnapshot { epoch, grants });
        drop(guard);

        let epoch_str = epoch.to_string();
        log_event_with_fields(Event::AclRefreshed, &[("epoch", epoch_str.as_str())]);
        epoch
    }
}

impl PermissionOracle for AclRegistry {
    fn can_read(&self, caller: &Identity, entity_type: &EntityType, id: EntityId) -> bool {
        self.snapshot().can_read(caller, entity_type, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_allows_only_listed() {
        let registry = AclRegistry::new(AclGrants::new().grant("alice", "TestCase", 1));
        let alice = Identity::user("alice");
        assert!(registry.can_read(&alice, &"TestCase".into(), 1));
        assert!(!registry.can_read(&alice, &"TestCase".into(), 2));
        assert!(!registry.can_read(&alice, &"Campaign".into(), 1));
        assert!(!registry.can_read(&Identity::user("bob"), &"TestCase".into(), 1));
    }

    #[test]
    fn test_administrator_reads_everything() {
        let registry = AclRegistry::new(AclGrants::new());
        assert!(registry.can_read(&Identity::administrator("root"), &"Campaign".into(), 9));
    }

    #[test]
    fn test_refresh_swaps_snapshot() {
        let registry = AclRegistry::new(AclGrants::new());
        let alice = Identity::user("alice");
        let before = registry.snapshot();
        assert!(!registry.can_read(&alice, &"TestCase".into(), 1));

        let epoch = registry.refresh_acls(AclGrants::new().grant("alice", "TestCase", 1));
        assert_eq!(epoch, 1);
        assert!(registry.can_read(&alice, &"TestCase".into(), 1));

        // A snapshot taken before the refresh keeps answering from its epoch
        assert_eq!(before.epoch(), 0);
        assert!(!before.can_read(&alice, &"TestCase".into(), 1));
    }

    #[test]
    fn test_grants_json() {
        let grants: AclGrants = serde_json::from_str(r#"{"alice": {"TestCase": [1, 2]}}"#).unwrap();
        let registry = AclRegistry::new(grants);
        assert!(registry.can_read(&Identity::user("alice"), &"TestCase".into(), 2));
    }
}
