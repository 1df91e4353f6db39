//! The list controller: one state machine tying together fetch
//! orchestration, client-side pagination, the derived filter, and
//! optimistic row mutations.
//!
//! The controller is driven from a single UI task but its fetches are
//! asynchronous, so two guards protect the dataset: a generation counter
//! that drops responses superseded by a newer fetch, and a closed flag that
//! drops responses arriving after the owning view unmounted.

use crate::error::{ListError, ListResult};
use crate::filter::{DerivedFilter, FilterState, Summary};
use crate::pagination::{paginate, PaginationState};
use crate::source::{DataSource, MutationEndpoint};
use crate::{DatasetItem, ListConfig, ListEvent, ListMetrics};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// User-visible error condition raised by the last failed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorState {
    /// Message for the error dialog/toast
    pub message: String,

    /// Whether the error dialog is currently open; `dismiss_error` closes
    /// it without clearing the message
    pub dialog_open: bool,
}

/// Outcome of requesting a row mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The mutation was sent and applied to local state
    Applied,

    /// The mutation is staged and waits for `confirm` with this token
    PendingConfirmation(Uuid),
}

/// Snapshot of everything a list screen renders.
#[derive(Debug, Clone)]
pub struct ListView<T: DatasetItem> {
    /// The current page of the filtered dataset
    pub items: Vec<T>,

    /// Current page, 1-based
    pub page_no: usize,

    /// Current page size
    pub limit: usize,

    /// Page count of the filtered dataset; 0 when it is empty
    pub total_pages: usize,

    /// Size of the filtered dataset (what the page count is based on)
    pub total_items: usize,

    /// Badge counts from the full unfiltered dataset
    pub summary: Summary,

    /// True from fetch start until the fetch settles
    pub loading: bool,

    /// Last surfaced error, if any
    pub error: Option<ErrorState>,

    /// Banner text when the mutating feature degraded to read-only
    pub read_only_banner: Option<String>,

    /// Row ids with an outstanding mutation, for per-row control disabling
    pub in_flight: Vec<String>,

    /// When the current dataset was fetched
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Staged, not-yet-confirmed row mutation
#[derive(Debug, Clone)]
struct PendingMutation {
    token: Uuid,
    id: String,
    patch: Value,
}

/// Mutable controller state behind one lock, so the view can never observe
/// a half-applied recomputation.
#[derive(Debug)]
struct ListState<T: DatasetItem> {
    /// Full dataset from the last successful fetch, replaced wholesale
    dataset: Vec<T>,

    /// Dataset after the derived filter (and optional sort); feeds pagination
    filtered: Vec<T>,

    /// Current page slice of `filtered`
    visible: Vec<T>,

    summary: Summary,
    total_pages: usize,
    filters: FilterState,
    derived: DerivedFilter,
    pagination: PaginationState,
    loading: bool,
    last_error: Option<ErrorState>,
    read_only: Option<String>,
    in_flight: HashSet<String>,
    pending: Option<PendingMutation>,
    fetched_at: Option<DateTime<Utc>>,
    metrics: ListMetrics,
}

/// Recompute the filtered set, clamp the page against the new total, and
/// slice the visible page. This is the single reactive recomputation keyed
/// on (dataset, derived filter, sort, page, limit); callers invoke it after
/// any change to one of those inputs.
fn recompute_view<T: DatasetItem>(st: &mut ListState<T>, sort: bool) {
    let derived = st.derived;
    let mut filtered: Vec<T> = st
        .dataset
        .iter()
        .filter(|item| derived.matches(*item))
        .cloned()
        .collect();

    if sort {
        filtered.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }

    let mut slice = paginate(filtered.len(), st.pagination.page_no(), st.pagination.limit());
    if slice.total_pages > 0 && st.pagination.page_no() > slice.total_pages {
        // The filtered total shrank under the current page.
        st.pagination.set_page(slice.total_pages);
        slice = paginate(filtered.len(), st.pagination.page_no(), st.pagination.limit());
    }

    st.visible = filtered[slice.range.clone()].to_vec();
    st.total_pages = slice.total_pages;
    st.filtered = filtered;
}

/// Synchronizes a server-fetched dataset with filters, pagination, and
/// optimistic mutations for one list screen.
pub struct ListController<T: DatasetItem> {
    config: ListConfig,
    source: Arc<dyn DataSource<T>>,
    mutator: Option<Arc<dyn MutationEndpoint<T>>>,
    state: RwLock<ListState<T>>,

    /// Fetch generation; a response is applied only while its generation is
    /// still the latest
    generation: AtomicU64,

    /// Set on unmount; in-flight responses arriving afterwards are dropped
    closed: AtomicBool,

    callbacks: Vec<Arc<dyn Fn(ListEvent) + Send + Sync>>,
}

impl<T: DatasetItem> ListController<T> {
    /// Create a controller with the default configuration
    pub fn new<S>(source: Arc<S>) -> Self
    where
        S: DataSource<T> + 'static,
    {
        Self::with_config(source, ListConfig::default())
    }

    /// Create a controller with a custom configuration
    pub fn with_config<S>(source: Arc<S>, config: ListConfig) -> Self
    where
        S: DataSource<T> + 'static,
    {
        // The initial limit must be something set_limit would accept.
        let initial_limit = if config.page_sizes.contains(&config.default_limit) {
            config.default_limit
        } else {
            config
                .page_sizes
                .iter()
                .copied()
                .min_by_key(|size| size.abs_diff(config.default_limit))
                .unwrap_or(config.default_limit)
        };

        let state = ListState {
            dataset: Vec::new(),
            filtered: Vec::new(),
            visible: Vec::new(),
            summary: Summary::default(),
            total_pages: 0,
            filters: FilterState::new(),
            derived: DerivedFilter::All,
            pagination: PaginationState::new(initial_limit),
            loading: false,
            last_error: None,
            read_only: None,
            in_flight: HashSet::new(),
            pending: None,
            fetched_at: None,
            metrics: ListMetrics::default(),
        };

        Self {
            config,
            source,
            mutator: None,
            state: RwLock::new(state),
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            callbacks: Vec::new(),
        }
    }

    /// Attach the mutation endpoint for row-level updates
    pub fn with_mutation_endpoint<M>(mut self, endpoint: Arc<M>) -> Self
    where
        M: MutationEndpoint<T> + 'static,
    {
        self.mutator = Some(endpoint);
        self
    }

    /// Register an event callback
    pub fn add_callback<F>(&mut self, callback: F)
    where
        F: Fn(ListEvent) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
    }

    fn emit(&self, event: ListEvent) {
        for callback in &self.callbacks {
            callback(event.clone());
        }
    }

    /// Mark the controller closed (view unmounted). In-flight requests keep
    /// running but their results are discarded.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Fetch the dataset for the current filter state, replacing it
    /// wholesale and returning to page 1.
    ///
    /// Issues the search query once the trimmed term passes the length
    /// threshold, the listing query otherwise. On failure the dataset is
    /// cleared and the error surfaced; there is no automatic retry.
    pub async fn refresh(&self) {
        if self.is_closed() {
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (term, query) = {
            let mut st = self.state.write().await;
            st.loading = true;
            st.pagination.reset_page();
            (
                st.filters
                    .search_request(self.config.search_min_len)
                    .map(str::to_owned),
                st.filters.to_query(),
            )
        };

        debug!(generation, search = term.is_some(), "fetching dataset");
        let started = Instant::now();
        let result = match &term {
            Some(term) => self.source.search(term, &query).await,
            None => self.source.list(&query).await,
        };

        if self.is_closed() {
            debug!(generation, "controller closed, dropping fetch response");
            return;
        }

        let event = {
            let mut st = self.state.write().await;
            if self.generation.load(Ordering::SeqCst) != generation {
                // A newer fetch owns the dataset and the loading flag now.
                debug!(generation, "dropping superseded fetch response");
                st.metrics.stale_discards += 1;
                ListEvent::StaleResponseDiscarded { generation }
            } else {
                st.loading = false;
                st.metrics.total_fetches += 1;
                st.metrics.last_fetch_duration_ms = started.elapsed().as_millis() as u64;
                match result {
                    Ok(items) => {
                        let count = items.len();
                        st.dataset = items;
                        st.fetched_at = Some(Utc::now());
                        st.summary = Summary::of(&st.dataset);
                        recompute_view(&mut st, self.config.sort_by_key);
                        debug!(count, "dataset replaced");
                        ListEvent::DatasetReplaced { count }
                    }
                    Err(e) => {
                        warn!(error = %e, "list fetch failed, clearing dataset");
                        st.dataset.clear();
                        st.fetched_at = None;
                        st.summary = Summary::default();
                        recompute_view(&mut st, self.config.sort_by_key);
                        st.metrics.failed_fetches += 1;
                        st.last_error = Some(ErrorState {
                            message: e.to_string(),
                            dialog_open: true,
                        });
                        ListEvent::FetchFailed {
                            message: e.to_string(),
                        }
                    }
                }
            }
        };
        self.emit(event);
    }

    /// Set the free-text search term. Any change re-fetches; the term only
    /// switches the query kind once it passes the length threshold.
    pub async fn set_search_term(&self, term: impl Into<String>) {
        let changed = self.state.write().await.filters.set_search_term(term.into());
        if changed {
            self.emit(ListEvent::FilterChanged {
                field: "search_term".into(),
            });
            self.refresh().await;
        }
    }

    /// Set a structural filter entry and re-fetch if it changed
    pub async fn set_structural_filter(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        let key = key.into();
        let changed = self
            .state
            .write()
            .await
            .filters
            .set_structural(key.clone(), value.into());
        if changed {
            self.emit(ListEvent::FilterChanged { field: key });
            self.refresh().await;
        }
    }

    /// Remove a structural filter entry and re-fetch if it was present
    pub async fn remove_structural_filter(&self, key: &str) {
        let changed = self.state.write().await.filters.remove_structural(key);
        if changed {
            self.emit(ListEvent::FilterChanged { field: key.into() });
            self.refresh().await;
        }
    }

    /// Set the ambient scope token; a change is treated exactly like a
    /// structural filter change
    pub async fn set_scope(&self, scope: Option<String>) {
        let changed = self.state.write().await.filters.set_scope(scope);
        if changed {
            self.emit(ListEvent::FilterChanged {
                field: "scope".into(),
            });
            self.refresh().await;
        }
    }

    /// Change the derived (client-only) filter. Re-slices in-memory data and
    /// returns to page 1; never fetches.
    pub async fn set_derived_filter(&self, derived: DerivedFilter) {
        let changed = {
            let mut st = self.state.write().await;
            if st.derived == derived {
                false
            } else {
                st.derived = derived;
                st.pagination.reset_page();
                recompute_view(&mut st, self.config.sort_by_key);
                true
            }
        };
        if changed {
            self.emit(ListEvent::FilterChanged {
                field: "derived".into(),
            });
        }
    }

    /// Move to a page, clamped to the current page count. Never fetches.
    pub async fn set_page(&self, page_no: usize) {
        let event = {
            let mut st = self.state.write().await;
            let target = if st.total_pages > 0 {
                page_no.clamp(1, st.total_pages)
            } else {
                1
            };
            if target == st.pagination.page_no() {
                None
            } else {
                st.pagination.set_page(target);
                recompute_view(&mut st, self.config.sort_by_key);
                Some(ListEvent::PageChanged { page_no: target })
            }
        };
        if let Some(event) = event {
            self.emit(event);
        }
    }

    /// Change the page size. Must be one of the configured sizes; always
    /// returns to page 1. Never fetches.
    pub async fn set_limit(&self, limit: usize) -> ListResult<()> {
        if !self.config.page_sizes.contains(&limit) {
            return Err(ListError::Validation(format!(
                "page size {} is not one of {:?}",
                limit, self.config.page_sizes
            )));
        }

        let event = {
            let mut st = self.state.write().await;
            if st.pagination.limit() == limit {
                None
            } else {
                st.pagination.set_limit(limit);
                recompute_view(&mut st, self.config.sort_by_key);
                Some(ListEvent::LimitChanged { limit, page_no: 1 })
            }
        };
        if let Some(event) = event {
            self.emit(event);
        }
        Ok(())
    }

    /// Set a row's activation flag to true. Activation is the easy-to-revert
    /// direction and proceeds without confirmation.
    pub async fn activate(&self, id: &str) -> ListResult<MutationOutcome> {
        self.apply_mutation(id, json!({ "active": true })).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Set a row's activation flag to false. Deactivation is harder to
    /// reverse, so with `confirm_deactivation` enabled it is staged and must
    /// be confirmed with the returned token before anything is sent.
    pub async fn deactivate(&self, id: &str) -> ListResult<MutationOutcome> {
        let patch = json!({ "active": false });
        if !self.config.confirm_deactivation {
            self.apply_mutation(id, patch).await?;
            return Ok(MutationOutcome::Applied);
        }

        let token = Uuid::new_v4();
        {
            let mut st = self.state.write().await;
            if let Some(banner) = &st.read_only {
                return Err(ListError::NotSupported(banner.clone()));
            }
            if !st.dataset.iter().any(|item| item.id() == id) {
                return Err(ListError::Validation(format!("unknown row id {id}")));
            }
            if st.pending.is_some() {
                // The earlier token stays valid; the caller must confirm or
                // cancel it before staging another action.
                return Err(ListError::Validation(
                    "a staged action is already pending".into(),
                ));
            }
            st.pending = Some(PendingMutation {
                token,
                id: id.to_string(),
                patch,
            });
        }
        Ok(MutationOutcome::PendingConfirmation(token))
    }

    /// Execute the staged mutation matching `token`
    pub async fn confirm(&self, token: Uuid) -> ListResult<()> {
        let pending = {
            let mut st = self.state.write().await;
            match st.pending.take() {
                Some(pending) if pending.token == token => pending,
                Some(pending) => {
                    st.pending = Some(pending);
                    return Err(ListError::Validation(
                        "confirmation token does not match the staged action".into(),
                    ));
                }
                None => {
                    return Err(ListError::Validation(
                        "no staged action to confirm".into(),
                    ))
                }
            }
        };
        self.apply_mutation(&pending.id, pending.patch).await
    }

    /// Drop the staged mutation, if any
    pub async fn cancel_pending(&self) {
        self.state.write().await.pending = None;
    }

    /// Send an arbitrary row patch through the mutation endpoint
    pub async fn mutate(&self, id: &str, patch: Value) -> ListResult<()> {
        self.apply_mutation(id, patch).await
    }

    async fn apply_mutation(&self, id: &str, patch: Value) -> ListResult<()> {
        let mutator = self
            .mutator
            .clone()
            .ok_or_else(|| ListError::Validation("no mutation endpoint configured".into()))?;

        {
            let mut st = self.state.write().await;
            if let Some(banner) = &st.read_only {
                // Already downgraded; do not hit the missing route again.
                return Err(ListError::NotSupported(banner.clone()));
            }
            if !st.dataset.iter().any(|item| item.id() == id) {
                return Err(ListError::Validation(format!("unknown row id {id}")));
            }
            if !st.in_flight.insert(id.to_string()) {
                return Err(ListError::Validation(format!(
                    "a mutation for row {id} is already in flight"
                )));
            }
        }

        let result = mutator.update(id, patch).await;

        if self.is_closed() {
            return result.map(|_| ());
        }

        let mut events = Vec::new();
        let outcome = {
            let mut st = self.state.write().await;
            st.in_flight.remove(id);
            match result {
                Ok(item) => {
                    // Apply the server's row to every local copy; the view
                    // and summary are recomputed from the dataset, so no
                    // stale copy survives and no re-fetch is needed.
                    if let Some(slot) = st.dataset.iter_mut().find(|existing| existing.id() == id)
                    {
                        *slot = item;
                    }
                    st.summary = Summary::of(&st.dataset);
                    recompute_view(&mut st, self.config.sort_by_key);
                    st.metrics.mutations_applied += 1;
                    events.push(ListEvent::MutationApplied { id: id.to_string() });
                    Ok(())
                }
                Err(e) => {
                    st.metrics.mutations_failed += 1;
                    if e.is_not_supported() {
                        let banner =
                            "This action is not supported by the backend yet.".to_string();
                        warn!(row = id, "mutation endpoint missing, feature is now read-only");
                        st.read_only = Some(banner.clone());
                        events.push(ListEvent::FeatureDowngraded { message: banner });
                    }
                    st.last_error = Some(ErrorState {
                        message: e.to_string(),
                        dialog_open: true,
                    });
                    events.push(ListEvent::MutationFailed {
                        id: id.to_string(),
                        message: e.to_string(),
                    });
                    Err(e)
                }
            }
        };
        for event in events {
            self.emit(event);
        }
        outcome
    }

    /// Close the error dialog without clearing the message
    pub async fn dismiss_error(&self) {
        if let Some(error) = self.state.write().await.last_error.as_mut() {
            error.dialog_open = false;
        }
    }

    /// Snapshot of the current view state
    pub async fn view(&self) -> ListView<T> {
        let st = self.state.read().await;
        let mut in_flight: Vec<String> = st.in_flight.iter().cloned().collect();
        in_flight.sort();
        ListView {
            items: st.visible.clone(),
            page_no: st.pagination.page_no(),
            limit: st.pagination.limit(),
            total_pages: st.total_pages,
            total_items: st.filtered.len(),
            summary: st.summary,
            loading: st.loading,
            error: st.last_error.clone(),
            read_only_banner: st.read_only.clone(),
            in_flight,
            fetched_at: st.fetched_at,
        }
    }

    /// Fetch and mutation counters
    pub async fn metrics(&self) -> ListMetrics {
        self.state.read().await.metrics.clone()
    }
}
