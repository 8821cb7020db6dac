//! Observability subsystem
//!
//! - Structured logging (JSON lines, deterministic key order)
//! - Monotonic metrics counters
//! - Lifecycle events and begin/complete scopes
//!
//! Observability is read-only: nothing here influences what a query returns.

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        match event {
            Event::ScopeReferenceDropped | Event::ScopingFilterSkipped | Event::QueryRejected => {
                Severity::Warn
            }
            Event::ScopeReadDenied | Event::PlanCacheHit => Severity::Trace,
            Event::QueryFailed => Severity::Error,
            _ => Severity::Info,
        }
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::CatalogLoaded);
        log_event(Event::AclRefreshed);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(
            Event::ScopeReferenceDropped,
            &[("entity_type", "TestCase"), ("id", "42")],
        );
    }
}
