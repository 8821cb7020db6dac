//! Result types for plan execution

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Paging;

/// One output row: projections first, then aggregations
pub type Tuple = Vec<Value>;

/// Ordered tuples with their column names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub tuples: Vec<Tuple>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, tuples: Vec<Tuple>) -> Self {
        Self { columns, tuples }
    }

    pub fn empty(columns: Vec<String>) -> Self {
        Self::new(columns, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, in tuple order
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.tuples.iter().filter_map(|t| t.get(index)).collect())
    }

    /// Keeps only the requested page.
    ///
    /// No paging keeps everything. A zero page size or a page past the end
    /// leaves the set empty.
    pub fn paged(mut self, paging: Option<&Paging>) -> Self {
        let Some(paging) = paging else {
            return self;
        };
        let start = match paging.offset() {
            Some(start) if paging.size > 0 && start < self.tuples.len() => start,
            _ => {
                self.tuples.clear();
                return self;
            }
        };
        let end = start.saturating_add(paging.size).min(self.tuples.len());
        self.tuples = self.tuples.drain(start..end).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numbers(n: i64) -> ResultSet {
        ResultSet::new(
            vec!["N".into()],
            (0..n).map(|i| vec![json!(i)]).collect(),
        )
    }

    #[test]
    fn test_no_paging_keeps_all() {
        assert_eq!(numbers(5).paged(None).len(), 5);
    }

    #[test]
    fn test_page_slices() {
        let page = numbers(5).paged(Some(&Paging::new(1, 2)));
        assert_eq!(page.tuples, vec![vec![json!(2)], vec![json!(3)]]);
        let last = numbers(5).paged(Some(&Paging::new(2, 2)));
        assert_eq!(last.tuples, vec![vec![json!(4)]]);
    }

    #[test]
    fn test_page_boundaries_empty() {
        assert!(numbers(5).paged(Some(&Paging::new(0, 0))).is_empty());
        assert!(numbers(5).paged(Some(&Paging::new(3, 2))).is_empty());
        assert!(numbers(5).paged(Some(&Paging::new(usize::MAX, 2))).is_empty());
    }

    #[test]
    fn test_column_lookup() {
        let set = numbers(3);
        assert_eq!(set.column_index("N"), Some(0));
        assert_eq!(set.column("N").unwrap().len(), 3);
        assert!(set.column("M").is_none());
    }
}
