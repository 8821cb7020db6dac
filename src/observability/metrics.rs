//! Metrics registry
//!
//! Counters only, monotonic, reset only on process start.
//! Relaxed atomics: counters are read for reporting, never for control flow.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of one engine instance
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    queries_prepared: AtomicU64,
    queries_rejected: AtomicU64,
    queries_executed: AtomicU64,
    queries_failed: AtomicU64,
    tuples_returned: AtomicU64,
    scope_references_dropped: AtomicU64,
    scope_read_denials: AtomicU64,
    plan_cache_hits: AtomicU64,
    plan_cache_misses: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_queries_prepared(&self) {
        self.queries_prepared.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_failed(&self) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Add to the number of tuples handed back to callers
    pub fn add_tuples_returned(&self, count: u64) {
        self.tuples_returned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_scope_references_dropped(&self, count: u64) {
        self.scope_references_dropped
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_scope_read_denials(&self, count: u64) {
        self.scope_read_denials.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_plan_cache_hits(&self) {
        self.plan_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_plan_cache_misses(&self) {
        self.plan_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_prepared: self.queries_prepared.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            tuples_returned: self.tuples_returned.load(Ordering::Relaxed),
            scope_references_dropped: self.scope_references_dropped.load(Ordering::Relaxed),
            scope_read_denials: self.scope_read_denials.load(Ordering::Relaxed),
            plan_cache_hits: self.plan_cache_hits.load(Ordering::Relaxed),
            plan_cache_misses: self.plan_cache_misses.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_prepared: u64,
    pub queries_rejected: u64,
    pub queries_executed: u64,
    pub queries_failed: u64,
    pub tuples_returned: u64,
    pub scope_references_dropped: u64,
    pub scope_read_denials: u64,
    pub plan_cache_hits: u64,
    pub plan_cache_misses: u64,
}

impl MetricsSnapshot {
    /// Serializes the snapshot as a single JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_registry_is_zero() {
        let metrics = MetricsRegistry::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_counters_accumulate() {
        let metrics = MetricsRegistry::new();
        metrics.increment_queries_prepared();
        metrics.increment_queries_prepared();
        metrics.add_tuples_returned(7);
        metrics.add_scope_read_denials(2);

        let snap = metrics.snapshot();
        assert_eq!(snap.queries_prepared, 2);
        assert_eq!(snap.tuples_returned, 7);
        assert_eq!(snap.scope_read_denials, 2);
    }

    #[test]
    fn test_concurrent_increments() {
        let metrics = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..250 {
                        m.increment_queries_executed();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.snapshot().queries_executed, 1000);
    }

    #[test]
    fn test_snapshot_json() {
        let metrics = MetricsRegistry::new();
        metrics.increment_plan_cache_hits();
        let parsed: serde_json::Value =
            serde_json::from_str(&metrics.snapshot().to_json()).unwrap();
        assert_eq!(parsed["plan_cache_hits"], 1);
    }
}
