//! A query model packaged with scope, paging and caller

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::query::QueryModel;
use crate::scope::{EntityReference, Identity};
use crate::sort::Sort;

/// Paging request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Paging {
    /// 0-based page number
    pub page: usize,
    pub size: usize,
    /// Appended after the model's ordering columns
    #[serde(default)]
    pub sort: Sort,
}

impl Paging {
    pub fn new(page: usize, size: usize) -> Self {
        Self {
            page,
            size,
            sort: Sort::unsorted(),
        }
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Index of the first tuple of the page, `None` on overflow
    pub fn offset(&self) -> Option<usize> {
        self.page.checked_mul(self.size)
    }
}

/// Everything the engine needs to compile and run one request
#[derive(Clone)]
pub struct ConfiguredQuery {
    pub model: Arc<dyn QueryModel>,
    /// `None` or empty: unrestricted
    pub scope: Option<Vec<EntityReference>>,
    /// `None`: unpaged
    pub paging: Option<Paging>,
    pub caller: Identity,
}

impl ConfiguredQuery {
    pub fn new(model: impl QueryModel + 'static) -> Self {
        Self::from_shared(Arc::new(model))
    }

    pub fn from_shared(model: Arc<dyn QueryModel>) -> Self {
        Self {
            model,
            scope: None,
            paging: None,
            caller: Identity::default(),
        }
    }

    pub fn with_scope(mut self, scope: Vec<EntityReference>) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_paging(mut self, paging: Paging) -> Self {
        self.paging = Some(paging);
        self
    }

    pub fn as_caller(mut self, caller: Identity) -> Self {
        self.caller = caller;
        self
    }

    pub fn scope(&self) -> Option<&[EntityReference]> {
        self.scope.as_deref()
    }

    /// Sort requested with the page, if any
    pub fn paging_sort(&self) -> Option<&Sort> {
        self.paging.as_ref().map(|p| &p.sort)
    }
}

impl std::fmt::Debug for ConfiguredQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredQuery")
            .field("scope", &self.scope)
            .field("paging", &self.paging)
            .field("caller", &self.caller)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QueryDefinition;

    #[test]
    fn test_paging_offset() {
        assert_eq!(Paging::new(3, 10).offset(), Some(30));
        assert_eq!(Paging::new(usize::MAX, 2).offset(), None);
    }

    #[test]
    fn test_defaults_unrestricted_unpaged() {
        let query = ConfiguredQuery::new(QueryDefinition::default());
        assert!(query.scope().is_none());
        assert!(query.paging.is_none());
        assert!(query.paging_sort().is_none());
    }

    #[test]
    fn test_paging_json() {
        let paging: Paging = serde_json::from_str(
            r#"{"page":1,"size":20,"sort":[{"property":"CAMPAIGN_NAME","direction":"DESC"}]}"#,
        )
        .unwrap();
        assert_eq!(paging.size, 20);
        assert!(!paging.sort.is_unsorted());
    }
}
