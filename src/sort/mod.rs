//! Sort specification
//!
//! Generic sort criteria and their translation into ordering expressions
//! anchored at the query root alias.

mod builder;
mod criteria;

pub use builder::{NullPlacement, OrderExpr, SortBuilder, TypedOrdering};
pub use criteria::{Direction, NullHandling, Sort, SortOrder};
