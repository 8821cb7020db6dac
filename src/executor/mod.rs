//! Plan execution
//!
//! Backends run compiled plans and return ordered, paged tuples. A plan is
//! bound to a backend only when it runs.
//!
//! The in-memory backend evaluates in this order:
//!
//! 1. Scope filter and semi-joins on each root row
//! 2. Fan-out sub-expressions, one partial per root
//! 3. Base joins and predicates
//! 4. Grouping and aggregation
//! 5. Sort
//! 6. Paging

mod aggregate;
mod backend;
mod compare;
mod errors;
mod executor;
mod filters;
mod memory;
mod result;
mod sorter;

pub use aggregate::{Accumulator, Total};
pub use backend::{BoundPlan, StorageBackend};
pub use compare::{compare_values, values_equal};
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use executor::{PlanEvaluator, Row, Tables};
pub use filters::{PredicateFilter, RegexMatch, SpecialMatcher, SpecialOperation, SpecialOperations};
pub use memory::MemoryStore;
pub use result::{ResultSet, Tuple};
pub use sorter::ResultSorter;
