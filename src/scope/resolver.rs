//! Scope resolver
//!
//! Expands scope references into the leaf entities the caller may read.
//!
//! Rules:
//! - Absent or empty scope: unrestricted, no permission check at all
//! - Containers expand transitively; a container seen twice is skipped
//! - References to nothing are dropped (WARN)
//! - Unreadable leaves are dropped (TRACE); one denial never aborts the rest
//! - A restricted scope stays restricted even if every leaf was dropped

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use super::directory::{DirectoryEntry, EntityDirectory};
use super::permission::{Identity, PermissionOracle};
use super::{EntityReference, ResolvedScope};
use crate::catalog::{EntityId, EntityType};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// Scope resolver bound to a directory and a permission oracle
#[derive(Clone)]
pub struct ScopeResolver {
    directory: Arc<dyn EntityDirectory>,
    oracle: Arc<dyn PermissionOracle>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl ScopeResolver {
    pub fn new(directory: Arc<dyn EntityDirectory>, oracle: Arc<dyn PermissionOracle>) -> Self {
        Self {
            directory,
            oracle,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Resolves a scope for a caller
    pub fn resolve(&self, scope: Option<&[EntityReference]>, caller: &Identity) -> ResolvedScope {
        let references = match scope {
            None => return ResolvedScope::Unrestricted,
            Some(refs) if refs.is_empty() => return ResolvedScope::Unrestricted,
            Some(refs) => refs,
        };

        let mut leaves: BTreeMap<EntityType, BTreeSet<EntityId>> = BTreeMap::new();
        let mut visited: HashSet<EntityReference> = HashSet::new();
        let mut pending: Vec<EntityReference> = references.iter().rev().cloned().collect();
        let mut dropped = 0u64;
        let mut denied = 0u64;

        while let Some(reference) = pending.pop() {
            if !visited.insert(reference.clone()) {
                continue;
            }

            match self.directory.lookup(&reference) {
                None => {
                    dropped += 1;
                    let id = reference.id.to_string();
                    log_event_with_fields(
                        Event::ScopeReferenceDropped,
                        &[
                            ("entity_type", reference.entity_type.as_str()),
                            ("id", id.as_str()),
                        ],
                    );
                }
                Some(DirectoryEntry::Container(children)) => {
                    pending.extend(children.into_iter().rev());
                }
                Some(DirectoryEntry::Leaf) => {
                    if self
                        .oracle
                        .can_read(caller, &reference.entity_type, reference.id)
                    {
                        leaves
                            .entry(reference.entity_type)
                            .or_default()
                            .insert(reference.id);
                    } else {
                        denied += 1;
                        let id = reference.id.to_string();
                        log_event_with_fields(
                            Event::ScopeReadDenied,
                            &[
                                ("entity_type", reference.entity_type.as_str()),
                                ("id", id.as_str()),
                                ("login", caller.login.as_str()),
                            ],
                        );
                    }
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.add_scope_references_dropped(dropped);
            metrics.add_scope_read_denials(denied);
        }

        let resolved = ResolvedScope::Restricted(leaves);
        let leaf_count = resolved.leaf_count().to_string();
        let dropped_str = dropped.to_string();
        let denied_str = denied.to_string();
        log_event_with_fields(
            Event::ScopeResolved,
            &[
                ("leaves", leaf_count.as_str()),
                ("dropped", dropped_str.as_str()),
                ("denied", denied_str.as_str()),
            ],
        );
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixtureDirectory {
        entries: HashMap<EntityReference, DirectoryEntry>,
    }

    impl EntityDirectory for FixtureDirectory {
        fn lookup(&self, reference: &EntityReference) -> Option<DirectoryEntry> {
            self.entries.get(reference).cloned()
        }
    }

    /// Denies odd ids and counts calls
    #[derive(Default)]
    struct CountingOracle {
        calls: AtomicUsize,
    }

    impl PermissionOracle for CountingOracle {
        fn can_read(&self, _caller: &Identity, _entity_type: &EntityType, id: EntityId) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            id % 2 == 0
        }
    }

    fn leaf(t: &str, id: EntityId) -> EntityReference {
        EntityReference::new(t, id)
    }

    fn fixture() -> (ScopeResolver, Arc<CountingOracle>, Arc<MetricsRegistry>) {
        let mut entries = HashMap::new();
        entries.insert(
            leaf("Folder", 1),
            DirectoryEntry::Container(vec![leaf("TestCase", 2), leaf("Folder", 2)]),
        );
        // Folder 2 points back at folder 1
        entries.insert(
            leaf("Folder", 2),
            DirectoryEntry::Container(vec![leaf("TestCase", 3), leaf("TestCase", 4), leaf("Folder", 1)]),
        );
        for id in 2..=4 {
            entries.insert(leaf("TestCase", id), DirectoryEntry::Leaf);
        }
        entries.insert(leaf("Campaign", 10), DirectoryEntry::Leaf);

        let oracle = Arc::new(CountingOracle::default());
        let metrics = Arc::new(MetricsRegistry::new());
        let resolver = ScopeResolver::new(Arc::new(FixtureDirectory { entries }), oracle.clone())
            .with_metrics(metrics.clone());
        (resolver, oracle, metrics)
    }

    #[test]
    fn test_absent_and_empty_scope_skip_permission_checks() {
        let (resolver, oracle, _) = fixture();
        let caller = Identity::user("alice");
        assert_eq!(resolver.resolve(None, &caller), ResolvedScope::Unrestricted);
        assert_eq!(resolver.resolve(Some(&[][..]), &caller), ResolvedScope::Unrestricted);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_containers_expand_cycle_safe() {
        let (resolver, _, metrics) = fixture();
        let scope = [leaf("Folder", 1)];
        let resolved = resolver.resolve(Some(&scope[..]), &Identity::user("alice"));
        // 3 is denied (odd)
        assert_eq!(resolved.ids(&"TestCase".into()), Some(&BTreeSet::from([2, 4])));
        assert_eq!(metrics.snapshot().scope_read_denials, 1);
    }

    #[test]
    fn test_missing_reference_dropped_silently() {
        let (resolver, _, metrics) = fixture();
        let scope = [leaf("Campaign", 10), leaf("Campaign", 99)];
        let resolved = resolver.resolve(Some(&scope[..]), &Identity::user("alice"));
        assert_eq!(resolved.leaf_count(), 1);
        assert_eq!(metrics.snapshot().scope_references_dropped, 1);
    }

    #[test]
    fn test_all_dropped_stays_restricted() {
        let (resolver, _, _) = fixture();
        let scope = [leaf("TestCase", 3), leaf("Campaign", 99)];
        let resolved = resolver.resolve(Some(&scope[..]), &Identity::user("alice"));
        assert!(!resolved.is_unrestricted());
        assert_eq!(resolved.leaf_count(), 0);
    }

    #[test]
    fn test_administrator_flag_does_not_bypass_oracle() {
        let (resolver, oracle, _) = fixture();
        let scope = [leaf("TestCase", 3)];
        let resolved = resolver.resolve(Some(&scope[..]), &Identity::administrator("root"));
        assert_eq!(resolved.leaf_count(), 0);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    }
}
