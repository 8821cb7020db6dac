//! ObservationScope for begin/complete logging around one engine operation
//!
//! - Logs `{event}_BEGIN` on creation (TRACE)
//! - Logs `{event}_COMPLETE` with `elapsed_ms` on `complete` (INFO)
//! - Logs `{event}_FAILED` with the error code on `fail` (ERROR)
//! - Logs `{event}_INCOMPLETE` if dropped without either (WARN)

use std::time::Instant;

use super::events::Event;
use super::logger::Logger;

/// A scope that logs the start and the outcome of an operation
pub struct ObservationScope {
    event: Event,
    completed: bool,
    fields: Vec<(&'static str, String)>,
    started_at: Instant,
}

impl ObservationScope {
    /// Create a new observation scope with identifying fields
    pub fn with_fields(event: Event, fields: &[(&'static str, &str)]) -> Self {
        let owned: Vec<(&'static str, String)> =
            fields.iter().map(|(k, v)| (*k, v.to_string())).collect();
        let scope = Self {
            event,
            completed: false,
            fields: owned,
            started_at: Instant::now(),
        };
        Logger::trace(&format!("{}_BEGIN", event.as_str()), &scope.field_refs());
        scope
    }

    /// Create a new observation scope without fields
    pub fn new(event: Event) -> Self {
        Self::with_fields(event, &[])
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    /// Milliseconds since the scope was opened
    pub fn elapsed_ms(&self) -> String {
        self.started_at.elapsed().as_millis().to_string()
    }

    /// Mark the scope as successfully completed with additional fields
    pub fn complete_with_fields(mut self, extra_fields: &[(&str, &str)]) {
        self.completed = true;
        let elapsed = self.elapsed_ms();
        let mut all_fields = self.field_refs();
        all_fields.extend(extra_fields.iter().copied());
        all_fields.push(("elapsed_ms", elapsed.as_str()));
        Logger::info(&format!("{}_COMPLETE", self.event.as_str()), &all_fields);
    }

    /// Mark the scope as successfully completed
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as failed with an error code and reason
    pub fn fail(mut self, code: &str, reason: &str) {
        self.completed = true;
        let mut all_fields = self.field_refs();
        all_fields.push(("code", code));
        all_fields.push(("reason", reason));
        Logger::error(&format!("{}_FAILED", self.event.as_str()), &all_fields);
    }

    /// Check if the scope has been closed
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.completed {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.event.as_str()),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}
