//! Observable events of the query engine
//!
//! Events are explicit and typed; the string form is what lands in the log line.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Startup
    /// Engine configuration loaded
    ConfigLoaded,
    /// Column catalog loaded and frozen
    CatalogLoaded,
    /// Column catalog failed to load (startup cannot continue)
    CatalogLoadFailed,

    // Scope resolution
    /// A scope reference pointed at nothing and was dropped
    ScopeReferenceDropped,
    /// A scoped leaf was excluded because the caller cannot read it
    ScopeReadDenied,
    /// Scope resolved to a restricted leaf set
    ScopeResolved,
    /// Permission snapshot swapped
    AclRefreshed,
    /// A decorator had no scoping values and adds no filter
    ScopingFilterSkipped,

    // Query lifecycle
    /// Query compilation
    QueryPrepare,
    /// Query rejected at compile time
    QueryRejected,
    /// Plan served from the plan cache
    PlanCacheHit,
    /// Query execution
    QueryExecute,
    /// Backend failed while running a plan
    QueryFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::CatalogLoaded => "CATALOG_LOADED",
            Event::CatalogLoadFailed => "CATALOG_LOAD_FAILED",

            Event::ScopeReferenceDropped => "SCOPE_REFERENCE_DROPPED",
            Event::ScopeReadDenied => "SCOPE_READ_DENIED",
            Event::ScopeResolved => "SCOPE_RESOLVED",
            Event::AclRefreshed => "ACL_REFRESHED",
            Event::ScopingFilterSkipped => "SCOPING_FILTER_SKIPPED",

            Event::QueryPrepare => "QUERY_PREPARE",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::PlanCacheHit => "PLAN_CACHE_HIT",
            Event::QueryExecute => "QUERY_EXECUTE",
            Event::QueryFailed => "QUERY_FAILED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::CatalogLoadFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::ConfigLoaded,
            Event::CatalogLoaded,
            Event::CatalogLoadFailed,
            Event::ScopeReferenceDropped,
            Event::ScopeReadDenied,
            Event::ScopeResolved,
            Event::AclRefreshed,
            Event::ScopingFilterSkipped,
            Event::QueryPrepare,
            Event::QueryRejected,
            Event::PlanCacheHit,
            Event::QueryExecute,
            Event::QueryFailed,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::CatalogLoadFailed.is_fatal());
        assert!(!Event::QueryRejected.is_fatal());
        assert!(!Event::ScopeReadDenied.is_fatal());
    }
}
