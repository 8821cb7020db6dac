//! Entity directory: existence and container membership

use std::sync::Arc;

use super::EntityReference;

/// What a reference points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEntry {
    Leaf,
    /// Folder-like entity; its children may be leaves or containers
    Container(Vec<EntityReference>),
}

/// Read-only view of which entities exist and what containers hold
pub trait EntityDirectory: Send + Sync {
    /// `None` if the reference points at nothing
    fn lookup(&self, reference: &EntityReference) -> Option<DirectoryEntry>;
}

impl<D: EntityDirectory + ?Sized> EntityDirectory for Arc<D> {
    fn lookup(&self, reference: &EntityReference) -> Option<DirectoryEntry> {
        (**self).lookup(reference)
    }
}
