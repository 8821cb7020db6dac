//! Plan cache
//!
//! Opt-in, bounded, FIFO. Keyed by a SHA-256 fingerprint of everything
//! that determines a plan: the model snapshot, the resolved scope and the
//! paging sort. A hit skips compilation only; the scope is resolved on
//! every request before the key can be computed.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::plan::Plan;
use crate::model::ModelSnapshot;
use crate::scope::ResolvedScope;
use crate::sort::Sort;

/// SHA-256 fingerprint of a compilation input
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanFingerprint(String);

impl PlanFingerprint {
    pub fn compute(
        snapshot: &ModelSnapshot,
        scope: &ResolvedScope,
        paging_sort: Option<&Sort>,
    ) -> serde_json::Result<Self> {
        #[derive(Serialize)]
        struct Input<'a> {
            model: &'a ModelSnapshot,
            scope: &'a ResolvedScope,
            sort: Option<&'a Sort>,
        }

        let bytes = serde_json::to_vec(&Input {
            model: snapshot,
            scope,
            sort: paging_sort,
        })?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hasher.finalize();
        Ok(Self(base64::Engine::encode(
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
            digest,
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
struct Entries {
    plans: HashMap<PlanFingerprint, Arc<Plan>>,
    order: VecDeque<PlanFingerprint>,
}

/// Bounded plan cache with first-in first-out eviction
#[derive(Debug)]
pub struct PlanCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl PlanCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn get(&self, key: &PlanFingerprint) -> Option<Arc<Plan>> {
        self.lock().plans.get(key).cloned()
    }

    /// Stores a plan, evicting the oldest entries beyond capacity
    pub fn insert(&self, key: PlanFingerprint, plan: Arc<Plan>) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.lock();
        if entries.plans.insert(key.clone(), plan).is_none() {
            entries.order.push_back(key);
        }
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.plans.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.plans.clear();
        entries.order.clear();
    }
}
