//! Predicate evaluation
//!
//! A null or missing value never satisfies a predicate, whatever the
//! operation. `LIKE` uses `%` and `_` wildcards and is case-sensitive.
//! Special operations are looked up by name in a registry; the backend
//! rejects names it does not know.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use super::compare::{compare_values, values_equal};
use super::errors::{StorageError, StorageResult};
use crate::model::Operation;
use crate::planner::{ColumnRef, Predicate};

/// Matcher produced by a special operation for one set of arguments
pub type SpecialMatcher = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Backend-specific filter operation
pub trait SpecialOperation: Send + Sync {
    /// Binds the filter values, failing if they make no sense for the operation
    fn prepare(&self, args: &[Value]) -> StorageResult<SpecialMatcher>;
}

/// `MATCHES pattern`: the string value matches a regular expression
pub struct RegexMatch;

impl SpecialOperation for RegexMatch {
    fn prepare(&self, args: &[Value]) -> StorageResult<SpecialMatcher> {
        let pattern = match args {
            [Value::String(pattern)] => pattern,
            _ => {
                return Err(StorageError::invalid_data(
                    "MATCHES takes exactly one string pattern",
                ))
            }
        };
        let regex = Regex::new(pattern).map_err(|e| {
            StorageError::invalid_data(format!("Invalid MATCHES pattern '{}': {}", pattern, e))
        })?;
        Ok(Box::new(move |value| match value {
            Value::String(s) => regex.is_match(s),
            _ => false,
        }))
    }
}

/// Special operations known to a backend
#[derive(Clone)]
pub struct SpecialOperations {
    operations: HashMap<String, Arc<dyn SpecialOperation>>,
}

impl SpecialOperations {
    /// Registry with no operations at all
    pub fn empty() -> Self {
        Self {
            operations: HashMap::new(),
        }
    }

    /// Registry with the built-in `MATCHES`
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("MATCHES", RegexMatch);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, operation: impl SpecialOperation + 'static) {
        self.operations.insert(name.into(), Arc::new(operation));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn SpecialOperation>> {
        self.operations.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for SpecialOperations {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for SpecialOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecialOperations")
            .field("operations", &self.names())
            .finish()
    }
}

enum Test {
    Compare(Operation, Vec<Value>),
    Like(Regex),
    Special(SpecialMatcher),
}

/// Predicate prepared once per run
pub struct PredicateFilter {
    column: ColumnRef,
    test: Test,
}

impl PredicateFilter {
    pub fn prepare(predicate: &Predicate, specials: &SpecialOperations) -> StorageResult<Self> {
        let test = match &predicate.operation {
            Operation::Like => {
                let pattern = match predicate.values.first() {
                    Some(Value::String(pattern)) => pattern,
                    _ => {
                        return Err(StorageError::invalid_data(format!(
                            "LIKE on {} needs a string pattern",
                            predicate.column.label
                        )))
                    }
                };
                Test::Like(like_regex(pattern)?)
            }
            Operation::Special(name) => {
                let operation = specials
                    .get(name)
                    .ok_or_else(|| StorageError::unsupported_operation(name))?;
                Test::Special(operation.prepare(&predicate.values)?)
            }
            other => Test::Compare(other.clone(), predicate.values.clone()),
        };
        Ok(Self {
            column: predicate.column.clone(),
            test,
        })
    }

    pub fn prepare_all(
        predicates: &[Predicate],
        specials: &SpecialOperations,
    ) -> StorageResult<Vec<Self>> {
        predicates
            .iter()
            .map(|p| Self::prepare(p, specials))
            .collect()
    }

    pub fn column(&self) -> &ColumnRef {
        &self.column
    }

    /// Tests a value; `None` stands for a missing or unbound column
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let value = match value {
            None | Some(Value::Null) => return false,
            Some(v) => v,
        };
        match &self.test {
            Test::Like(regex) => match value {
                Value::String(s) => regex.is_match(s),
                _ => false,
            },
            Test::Special(matcher) => matcher(value),
            Test::Compare(operation, values) => compare(operation, value, values),
        }
    }
}

fn compare(operation: &Operation, value: &Value, values: &[Value]) -> bool {
    let ordered = |i: usize| values.get(i).and_then(|bound| compare_values(value, bound));
    match operation {
        Operation::Equals => values.first().map_or(false, |v| values_equal(value, v)),
        Operation::NotEquals => values
            .first()
            .map_or(false, |v| !v.is_null() && !values_equal(value, v)),
        Operation::GreaterThan => ordered(0).map_or(false, |o| o.is_gt()),
        Operation::GreaterEqual => ordered(0).map_or(false, |o| o.is_ge()),
        Operation::LessThan => ordered(0).map_or(false, |o| o.is_lt()),
        Operation::LessEqual => ordered(0).map_or(false, |o| o.is_le()),
        Operation::Between => {
            ordered(0).map_or(false, |o| o.is_ge()) && ordered(1).map_or(false, |o| o.is_le())
        }
        Operation::In => values.iter().any(|v| values_equal(value, v)),
        Operation::Like | Operation::Special(_) => false,
    }
}

/// Translates a SQL `LIKE` pattern into an anchored regular expression
fn like_regex(pattern: &str) -> StorageResult<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for c in pattern.chars() {
        match c {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr)
        .map_err(|e| StorageError::invalid_data(format!("Invalid LIKE pattern '{}': {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DataKind;
    use crate::executor::StorageErrorCode;
    use serde_json::json;

    fn predicate(operation: Operation, values: Vec<Value>) -> Predicate {
        Predicate {
            column: ColumnRef {
                alias: "execution".into(),
                entity: "Execution".into(),
                attribute: "status".into(),
                label: "EXECUTION_STATUS".into(),
                kind: DataKind::Enumerated,
            },
            operation,
            values,
        }
    }

    fn filter(operation: Operation, values: Vec<Value>) -> PredicateFilter {
        PredicateFilter::prepare(&predicate(operation, values), &SpecialOperations::with_builtins())
            .unwrap()
    }

    #[test]
    fn test_equality_match() {
        let f = filter(Operation::Equals, vec![json!("SUCCESS")]);
        assert!(f.matches(Some(&json!("SUCCESS"))));
        assert!(!f.matches(Some(&json!("FAILURE"))));
    }

    #[test]
    fn test_null_never_matches() {
        let f = filter(Operation::NotEquals, vec![json!("SUCCESS")]);
        assert!(f.matches(Some(&json!("FAILURE"))));
        assert!(!f.matches(Some(&Value::Null)));
        assert!(!f.matches(None));
    }

    #[test]
    fn test_range_predicates() {
        let between = filter(Operation::Between, vec![json!(10), json!(20)]);
        assert!(between.matches(Some(&json!(10))));
        assert!(between.matches(Some(&json!(20.0))));
        assert!(!between.matches(Some(&json!(21))));

        let gt = filter(Operation::GreaterThan, vec![json!("2024-01-01")]);
        assert!(gt.matches(Some(&json!("2024-02-01"))));
        assert!(!gt.matches(Some(&json!("2023-12-31"))));
    }

    #[test]
    fn test_in() {
        let f = filter(Operation::In, vec![json!(1), json!(3)]);
        assert!(f.matches(Some(&json!(3))));
        assert!(!f.matches(Some(&json!(2))));
    }

    #[test]
    fn test_like_wildcards() {
        let f = filter(Operation::Like, vec![json!("R_lease%")]);
        assert!(f.matches(Some(&json!("Release 1.0"))));
        assert!(!f.matches(Some(&json!("Pre-Release"))));
        // Regex metacharacters are literal
        let dotted = filter(Operation::Like, vec![json!("1.0")]);
        assert!(!dotted.matches(Some(&json!("100"))));
    }

    #[test]
    fn test_matches_builtin() {
        let f = filter(Operation::Special("MATCHES".into()), vec![json!("^ISS-[0-9]+$")]);
        assert!(f.matches(Some(&json!("ISS-42"))));
        assert!(!f.matches(Some(&json!("BUG-42"))));
    }

    #[test]
    fn test_unknown_special_rejected() {
        let err = PredicateFilter::prepare(
            &predicate(Operation::Special("FUZZY".into()), vec![json!("x")]),
            &SpecialOperations::with_builtins(),
        )
        .err()
        .unwrap();
        assert_eq!(err.code(), StorageErrorCode::UnsupportedOperation);
    }
}
