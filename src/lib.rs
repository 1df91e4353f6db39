//! Headless list-view synchronization engine.
//!
//! This crate provides the state machine behind server-backed admin list
//! screens: a full dataset fetched per filter combination, client-side
//! pagination, a purely client-side derived filter with summary counts, and
//! optimistic row-level mutations. Rendering, routing, and HTTP transport
//! are left to the caller; the engine only coordinates state.

pub mod controller;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod source;

pub use controller::*;
pub use error::*;
pub use filter::*;
pub use pagination::*;
pub use source::*;

use std::fmt::Debug;

/// Base trait for records managed by a list controller.
///
/// Records are opaque to the engine apart from a stable id, an optional
/// activation flag (feeding the built-in derived filter and summary counts),
/// and an optional sort key for client-side ordering.
pub trait DatasetItem: Debug + Clone + Send + Sync {
    /// Unique, stable identifier for the record
    fn id(&self) -> String;

    /// Activation flag used by the derived filter and summary counts.
    /// `None` means the record has no activation concept.
    fn is_active(&self) -> Option<bool> {
        None
    }

    /// Key used for client-side ordering when sorting is enabled.
    /// Records without a key sort first.
    fn sort_key(&self) -> Option<String> {
        None
    }

    /// Optional data payload for the record
    fn data(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Configuration for list controller behavior
#[derive(Debug, Clone)]
pub struct ListConfig {
    /// Page sizes the user may select; `set_limit` rejects anything else
    pub page_sizes: Vec<usize>,

    /// Page size applied at construction
    pub default_limit: usize,

    /// Minimum trimmed search-term length before the search query is used
    /// instead of the listing query (a length threshold, not a timer)
    pub search_min_len: usize,

    /// Whether deactivation must be staged and confirmed before it is sent
    pub confirm_deactivation: bool,

    /// Whether to sort the filtered dataset by `sort_key` before pagination
    pub sort_by_key: bool,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_sizes: vec![10, 20, 30, 40, 50],
            default_limit: 10,
            search_min_len: 3,
            confirm_deactivation: true,
            sort_by_key: false,
        }
    }
}

impl ListConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the selectable page sizes
    pub fn with_page_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.page_sizes = sizes;
        self
    }

    /// Set the initial page size
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Set the search activation threshold
    pub fn with_search_min_len(mut self, len: usize) -> Self {
        self.search_min_len = len;
        self
    }

    /// Allow deactivation without a staged confirmation
    pub fn without_confirmation(mut self) -> Self {
        self.confirm_deactivation = false;
        self
    }

    /// Enable client-side sorting by `sort_key`
    pub fn with_sorting(mut self) -> Self {
        self.sort_by_key = true;
        self
    }
}

/// Notifications emitted by a list controller
#[derive(Debug, Clone)]
pub enum ListEvent {
    /// The dataset was replaced by a successful fetch
    DatasetReplaced { count: usize },

    /// The visible page changed
    PageChanged { page_no: usize },

    /// The page size changed (always resets to page 1)
    LimitChanged { limit: usize, page_no: usize },

    /// A filter field changed
    FilterChanged { field: String },

    /// A fetch settled with an error; the dataset was cleared
    FetchFailed { message: String },

    /// A fetch response arrived after a newer fetch started and was dropped
    StaleResponseDiscarded { generation: u64 },

    /// A row mutation was applied to all local copies
    MutationApplied { id: String },

    /// A row mutation failed; local state is unchanged
    MutationFailed { id: String, message: String },

    /// The mutation endpoint is unavailable; the feature is now read-only
    FeatureDowngraded { message: String },
}

/// Counters for fetch and mutation activity
#[derive(Debug, Clone, Default)]
pub struct ListMetrics {
    /// Fetches that settled (success or failure)
    pub total_fetches: u64,

    /// Fetches that settled with an error
    pub failed_fetches: u64,

    /// Responses dropped by the staleness guard
    pub stale_discards: u64,

    /// Row mutations applied to local state
    pub mutations_applied: u64,

    /// Row mutations that failed
    pub mutations_failed: u64,

    /// Duration of the most recent settled fetch
    pub last_fetch_duration_ms: u64,
}

/// Simple record implementation for common use cases and tests
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SimpleRecord {
    pub id: String,
    pub label: String,
    pub active: Option<bool>,
    pub data: Option<serde_json::Value>,
}

impl SimpleRecord {
    /// Create a record with just an id and label
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            active: None,
            data: None,
        }
    }

    /// Set the activation flag
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Add a data payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl DatasetItem for SimpleRecord {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn is_active(&self) -> Option<bool> {
        self.active
    }

    fn sort_key(&self) -> Option<String> {
        Some(self.label.clone())
    }

    fn data(&self) -> Option<serde_json::Value> {
        self.data.clone()
    }
}
