//! Filter state: free-text search, structural filters, ambient scope, and
//! the purely client-side derived filter with its summary counts.
//!
//! Structural filters and the scope token require a new server query when
//! they change; the derived filter only re-slices data that is already in
//! memory.

use crate::source::ListQuery;
use crate::DatasetItem;
use std::collections::BTreeMap;

/// Server-relevant filter state. Every mutation reports whether the value
/// actually changed so the controller can skip redundant re-fetches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    search_term: String,
    structural: BTreeMap<String, String>,
    scope: Option<String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Set the free-text search term. Returns true if the term changed.
    pub fn set_search_term(&mut self, term: String) -> bool {
        if self.search_term == term {
            return false;
        }
        self.search_term = term;
        true
    }

    pub fn structural(&self) -> &BTreeMap<String, String> {
        &self.structural
    }

    /// Set a structural filter entry. Returns true if the entry changed.
    pub fn set_structural(&mut self, key: String, value: String) -> bool {
        if self.structural.get(&key) == Some(&value) {
            return false;
        }
        self.structural.insert(key, value);
        true
    }

    /// Remove a structural filter entry. Returns true if it was present.
    pub fn remove_structural(&mut self, key: &str) -> bool {
        self.structural.remove(key).is_some()
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Set the ambient scope token. A scope change is treated exactly like a
    /// structural filter change. Returns true if the scope changed.
    pub fn set_scope(&mut self, scope: Option<String>) -> bool {
        if self.scope == scope {
            return false;
        }
        self.scope = scope;
        true
    }

    /// The trimmed search term, when it is long enough to activate the
    /// server-side search query. Below the threshold partial input is
    /// ignored and the standard listing query is used.
    pub fn search_request(&self, min_len: usize) -> Option<&str> {
        let trimmed = self.search_term.trim();
        if trimmed.chars().count() >= min_len {
            Some(trimmed)
        } else {
            None
        }
    }

    /// Snapshot of the structural filters and scope for a server query.
    pub fn to_query(&self) -> ListQuery {
        ListQuery {
            filters: self.structural.clone(),
            scope: self.scope.clone(),
        }
    }
}

/// Client-side filter applied to the full fetched dataset. Its result feeds
/// pagination, so page counts reflect the filtered total. It never triggers
/// a server fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DerivedFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl DerivedFilter {
    pub fn matches<T: DatasetItem>(&self, item: &T) -> bool {
        match self {
            DerivedFilter::All => true,
            DerivedFilter::Active => item.is_active() == Some(true),
            DerivedFilter::Inactive => item.is_active() == Some(false),
        }
    }
}

/// Badge counts computed from the full unfiltered dataset. Invariant under
/// the derived-filter selection: picking "active only" must not change the
/// inactive badge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Summary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
}

impl Summary {
    pub fn of<T: DatasetItem>(items: &[T]) -> Self {
        let mut summary = Summary {
            total: items.len(),
            ..Default::default()
        };
        for item in items {
            match item.is_active() {
                Some(true) => summary.active += 1,
                Some(false) => summary.inactive += 1,
                None => {}
            }
        }
        summary
    }
}
