//! Store-agnostic sort criteria
//!
//! A `Sort` is what callers hand in with a paging request: property names,
//! directions and a null-handling hint, with no knowledge of the store.

use serde::{Deserialize, Serialize};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Where nulls go, as requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NullHandling {
    NullsFirst,
    NullsLast,
    /// Whatever the store does natively
    #[default]
    Native,
    /// Any value this version does not recognize
    #[serde(other)]
    Unknown,
}

/// One sort criterion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub property: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub null_handling: NullHandling,
}

impl SortOrder {
    pub fn new(property: impl Into<String>, direction: Direction) -> Self {
        Self {
            property: property.into(),
            direction,
            null_handling: NullHandling::Native,
        }
    }

    pub fn with_null_handling(mut self, null_handling: NullHandling) -> Self {
        self.null_handling = null_handling;
        self
    }
}

/// Ordered sequence of sort criteria; empty means unsorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sort(Vec<SortOrder>);

impl Sort {
    pub fn unsorted() -> Self {
        Self(Vec::new())
    }

    pub fn by(order: SortOrder) -> Self {
        Self(vec![order])
    }

    /// Appends a tie-breaking criterion
    pub fn then(mut self, order: SortOrder) -> Self {
        self.0.push(order);
        self
    }

    pub fn is_unsorted(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SortOrder> {
        self.0.iter()
    }
}

impl FromIterator<SortOrder> for Sort {
    fn from_iter<I: IntoIterator<Item = SortOrder>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_null_handling_deserializes() {
        let order: SortOrder =
            serde_json::from_str(r#"{"property":"x","direction":"DESC","null_handling":"NULLS_SIDEWAYS"}"#)
                .unwrap();
        assert_eq!(order.null_handling, NullHandling::Unknown);
        assert_eq!(order.direction, Direction::Desc);
    }

    #[test]
    fn test_defaults() {
        let order: SortOrder = serde_json::from_str(r#"{"property":"x"}"#).unwrap();
        assert_eq!(order.direction, Direction::Asc);
        assert_eq!(order.null_handling, NullHandling::Native);
    }

    #[test]
    fn test_sort_chain() {
        let sort = Sort::by(SortOrder::new("a", Direction::Asc)).then(SortOrder::new("b", Direction::Desc));
        assert!(!sort.is_unsorted());
        assert_eq!(sort.iter().count(), 2);
        assert!(Sort::unsorted().is_unsorted());
    }
}
