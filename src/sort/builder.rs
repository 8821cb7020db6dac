//! Sort specification builder
//!
//! Turns a generic `Sort` into ordering expressions anchored at the alias
//! of a root entity type.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::criteria::{Direction, NullHandling, Sort};
use crate::catalog::EntityType;

/// Store-level null placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPlacement {
    First,
    Last,
    /// Nulls sort as the smallest value
    Default,
}

impl NullPlacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            NullPlacement::First => "NULLS FIRST",
            NullPlacement::Last => "NULLS LAST",
            NullPlacement::Default => "",
        }
    }

    /// Orders a null against a non-null value under this placement
    pub fn null_vs_value(&self, direction: Direction) -> Ordering {
        match (self, direction) {
            (NullPlacement::First, _) => Ordering::Less,
            (NullPlacement::Last, _) => Ordering::Greater,
            (NullPlacement::Default, Direction::Asc) => Ordering::Less,
            (NullPlacement::Default, Direction::Desc) => Ordering::Greater,
        }
    }
}

impl From<NullHandling> for NullPlacement {
    fn from(handling: NullHandling) -> Self {
        match handling {
            NullHandling::NullsFirst => NullPlacement::First,
            NullHandling::NullsLast => NullPlacement::Last,
            NullHandling::Native | NullHandling::Unknown => NullPlacement::Default,
        }
    }
}

/// One typed ordering expression: `alias.property direction nulls`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderExpr {
    pub alias: String,
    pub property: String,
    pub direction: Direction,
    pub nulls: NullPlacement,
}

impl OrderExpr {
    /// Renders as `alias.property ASC NULLS FIRST`
    pub fn render(&self) -> String {
        let mut out = format!("{}.{} {}", self.alias, self.property, self.direction.as_str());
        if self.nulls != NullPlacement::Default {
            out.push(' ');
            out.push_str(self.nulls.as_str());
        }
        out
    }
}

/// Result of building a sort
///
/// `Unsorted` and `Ordered(vec![])` are distinct: the builder never
/// produces the latter, but downstream code must not conflate them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypedOrdering {
    Unsorted,
    Ordered(Vec<OrderExpr>),
}

impl TypedOrdering {
    pub fn is_unsorted(&self) -> bool {
        matches!(self, TypedOrdering::Unsorted)
    }

    pub fn exprs(&self) -> &[OrderExpr] {
        match self {
            TypedOrdering::Unsorted => &[],
            TypedOrdering::Ordered(exprs) => exprs,
        }
    }
}

/// Builds typed orderings
pub struct SortBuilder;

impl SortBuilder {
    pub fn build(root: &EntityType, sort: &Sort) -> TypedOrdering {
        if sort.is_unsorted() {
            return TypedOrdering::Unsorted;
        }
        let alias = root.alias();
        TypedOrdering::Ordered(
            sort.iter()
                .map(|order| OrderExpr {
                    alias: alias.clone(),
                    property: order.property.clone(),
                    direction: order.direction,
                    nulls: order.null_handling.into(),
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::SortOrder;

    #[test]
    fn test_unsorted_is_explicit() {
        let ordering = SortBuilder::build(&"Campaign".into(), &Sort::unsorted());
        assert_eq!(ordering, TypedOrdering::Unsorted);
        assert!(ordering.exprs().is_empty());
    }

    #[test]
    fn test_alias_from_root() {
        let sort = Sort::by(SortOrder::new("name", Direction::Desc));
        let ordering = SortBuilder::build(&"TestCase".into(), &sort);
        let exprs = ordering.exprs();
        assert_eq!(exprs.len(), 1);
        assert_eq!(exprs[0].alias, "testCase");
        assert_eq!(exprs[0].render(), "testCase.name DESC");
    }

    #[test]
    fn test_null_handling_mapping() {
        assert_eq!(NullPlacement::from(NullHandling::NullsFirst), NullPlacement::First);
        assert_eq!(NullPlacement::from(NullHandling::NullsLast), NullPlacement::Last);
        assert_eq!(NullPlacement::from(NullHandling::Native), NullPlacement::Default);
        assert_eq!(NullPlacement::from(NullHandling::Unknown), NullPlacement::Default);
    }

    #[test]
    fn test_nulls_first_render() {
        let sort = Sort::by(
            SortOrder::new("status", Direction::Asc).with_null_handling(NullHandling::NullsFirst),
        );
        let ordering = SortBuilder::build(&"Execution".into(), &sort);
        assert_eq!(ordering.exprs()[0].render(), "execution.status ASC NULLS FIRST");
    }

    #[test]
    fn test_default_null_placement() {
        assert_eq!(
            NullPlacement::Default.null_vs_value(Direction::Asc),
            Ordering::Less
        );
        assert_eq!(
            NullPlacement::Default.null_vs_value(Direction::Desc),
            Ordering::Greater
        );
        assert_eq!(NullPlacement::First.null_vs_value(Direction::Desc), Ordering::Less);
    }
}
