//! Infinite-scroll feed over one catalog query at a time.
//!
//! [`FeedState`] is the synchronous state machine; [`Paginator`] drives it
//! against a [`CatalogSource`] and publishes a [`FeedSnapshot`] after every
//! transition. Each fetch carries the generation it was issued under, so a
//! response that lands after a `reset` is dropped instead of applied.

use crate::alert::AlertView;
use crate::catalog::{CatalogError, CatalogQuery, CatalogSource};
use crate::model::{Title, TitleId};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use ts_rs::TS;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const FIRST_PAGE: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("failed to load page {page} of {context}: {source}")]
    FetchFailed {
        context: CatalogQuery,
        page: u32,
        #[source]
        source: CatalogError,
    },
}

impl FeedError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::FetchFailed { .. } => "fetch_failed",
        }
    }

    pub fn context(&self) -> &CatalogQuery {
        match self {
            Self::FetchFailed { context, .. } => context,
        }
    }

    pub fn catalog_error(&self) -> &CatalogError {
        match self {
            Self::FetchFailed { source, .. } => source,
        }
    }

    pub fn to_alert(&self) -> AlertView {
        AlertView::new(self.code(), self.catalog_error().user_message())
    }
}

/// What a load trigger ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { appended: usize },
    Exhausted,
    NotAtEnd,
    Busy,
    Stale,
    NothingToRetry,
}

/// A fetch that has been issued but not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageRequest {
    pub(crate) generation: u64,
    pub(crate) context: CatalogQuery,
    pub(crate) page: u32,
}

#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct FeedSnapshot {
    #[ts(type = "number")]
    pub request_id: u64,
    pub context: CatalogQuery,
    pub items: Vec<Title>,
    pub page: u32,
    pub page_size: u32,
    pub loading: bool,
    pub exhausted: bool,
    pub alert: Option<AlertView>,
}

#[derive(Debug, Clone)]
pub(crate) struct FeedState {
    context: CatalogQuery,
    items: Vec<Title>,
    page: u32,
    page_size: u32,
    exhausted: bool,
    in_flight: bool,
    generation: u64,
    last_error: Option<FeedError>,
}

impl FeedState {
    pub(crate) fn new(context: CatalogQuery, page_size: u32) -> Self {
        Self {
            context,
            items: Vec::new(),
            page: FIRST_PAGE,
            page_size: page_size.max(1),
            exhausted: false,
            in_flight: false,
            generation: 0,
            last_error: None,
        }
    }

    /// Switch to `context` with an empty item list; earlier requests become stale.
    pub(crate) fn reset(&mut self, context: CatalogQuery) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.context = context;
        self.items.clear();
        self.page = FIRST_PAGE;
        self.exhausted = false;
        self.in_flight = false;
        self.last_error = None;
        self.generation
    }

    pub(crate) fn begin_first_page(&mut self) -> PageRequest {
        self.page = FIRST_PAGE;
        self.in_flight = true;
        self.request(FIRST_PAGE)
    }

    pub(crate) fn begin_next_page(&mut self, last_visible: TitleId) -> Result<PageRequest, LoadOutcome> {
        if self.items.last().map(|title| title.id) != Some(last_visible) {
            return Err(LoadOutcome::NotAtEnd);
        }
        if self.in_flight {
            return Err(LoadOutcome::Busy);
        }
        if self.exhausted {
            return Err(LoadOutcome::Exhausted);
        }
        self.page += 1;
        self.in_flight = true;
        self.last_error = None;
        Ok(self.request(self.page))
    }

    /// Re-issue the page whose fetch failed last.
    pub(crate) fn begin_retry(&mut self) -> Option<PageRequest> {
        if self.in_flight {
            return None;
        }
        let page = match self.last_error.take()? {
            FeedError::FetchFailed { page, .. } => page,
        };
        self.page = page;
        self.in_flight = true;
        Some(self.request(page))
    }

    pub(crate) fn apply(
        &mut self,
        request: &PageRequest,
        result: Result<Vec<Title>, CatalogError>,
    ) -> Result<LoadOutcome, FeedError> {
        if request.generation != self.generation {
            debug!(
                request_id = request.generation,
                current = self.generation,
                context = %request.context,
                page = request.page,
                "Ignoring stale page response"
            );
            return Ok(LoadOutcome::Stale);
        }
        self.in_flight = false;

        match result {
            Ok(titles) if titles.is_empty() => {
                self.exhausted = true;
                debug!(context = %self.context, page = request.page, "Feed exhausted");
                Ok(LoadOutcome::Exhausted)
            }
            Ok(titles) => {
                let mut seen: HashSet<TitleId> = self.items.iter().map(|title| title.id).collect();
                let before = self.items.len();
                self.items
                    .extend(titles.into_iter().filter(|title| seen.insert(title.id)));
                let appended = self.items.len() - before;
                debug!(
                    context = %self.context,
                    page = request.page,
                    appended,
                    total = self.items.len(),
                    "Applied page"
                );
                Ok(LoadOutcome::Loaded { appended })
            }
            Err(source) => {
                self.page = request.page.saturating_sub(1).max(FIRST_PAGE);
                let err = FeedError::FetchFailed {
                    context: request.context.clone(),
                    page: request.page,
                    source,
                };
                warn!(
                    context = %request.context,
                    page = request.page,
                    code = err.catalog_error().code(),
                    "Page fetch failed: {err}"
                );
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Clear the in-flight marker of a request that will never be applied.
    pub(crate) fn abandon(&mut self, request: &PageRequest) {
        if request.generation == self.generation {
            self.in_flight = false;
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    fn request(&self, page: u32) -> PageRequest {
        PageRequest {
            generation: self.generation,
            context: self.context.clone(),
            page,
        }
    }

    fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            request_id: self.generation,
            context: self.context.clone(),
            items: self.items.clone(),
            page: self.page,
            page_size: self.page_size,
            loading: self.in_flight,
            exhausted: self.exhausted,
            alert: self.last_error.as_ref().map(FeedError::to_alert),
        }
    }
}

/// Async driver for a [`FeedState`]; shared between the view and search tasks.
pub struct Paginator<C: CatalogSource + ?Sized> {
    catalog: Arc<C>,
    state: Mutex<FeedState>,
    snapshots: watch::Sender<FeedSnapshot>,
}

impl<C: CatalogSource + ?Sized> Paginator<C> {
    /// Creates an idle feed; call [`Paginator::reset`] to load the first page.
    pub fn new(catalog: Arc<C>, context: CatalogQuery, page_size: u32) -> Self {
        let state = FeedState::new(context, page_size);
        let (snapshots, _) = watch::channel(state.snapshot());
        Self {
            catalog,
            state: Mutex::new(state),
            snapshots,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn catalog(&self) -> &Arc<C> {
        &self.catalog
    }

    pub fn page_size(&self) -> u32 {
        self.lock_state().page_size
    }

    /// Clear the feed, switch to `context` and fetch its first page.
    pub async fn reset(&self, context: CatalogQuery) -> Result<LoadOutcome, FeedError> {
        let request = {
            let mut state = self.lock_state();
            state.reset(context);
            let request = state.begin_first_page();
            self.publish(&state);
            request
        };
        info!(request_id = request.generation, context = %request.context, "Feed reset");
        self.fetch_and_apply(request).await
    }

    /// Load the next page when `last_visible` is the last loaded item.
    pub async fn on_item_appeared(&self, last_visible: TitleId) -> Result<LoadOutcome, FeedError> {
        let request = {
            let mut state = self.lock_state();
            match state.begin_next_page(last_visible) {
                Ok(request) => {
                    self.publish(&state);
                    request
                }
                Err(outcome) => return Ok(outcome),
            }
        };
        self.fetch_and_apply(request).await
    }

    /// Re-request the page that failed last. User-initiated only.
    pub async fn retry(&self) -> Result<LoadOutcome, FeedError> {
        let Some(request) = self.begin_retry() else {
            return Ok(LoadOutcome::NothingToRetry);
        };
        info!(context = %request.context, page = request.page, "Retrying page fetch");
        self.fetch_and_apply(request).await
    }

    /// Switch context without fetching; the caller owns the first-page request.
    pub(crate) fn begin_context(&self, context: CatalogQuery) -> PageRequest {
        let mut state = self.lock_state();
        state.reset(context);
        let request = state.begin_first_page();
        self.publish(&state);
        request
    }

    /// Mark the failed page in flight again; the caller owns the fetch.
    pub(crate) fn begin_retry(&self) -> Option<PageRequest> {
        let mut state = self.lock_state();
        let request = state.begin_retry()?;
        self.publish(&state);
        Some(request)
    }

    pub(crate) fn apply(
        &self,
        request: &PageRequest,
        result: Result<Vec<Title>, CatalogError>,
    ) -> Result<LoadOutcome, FeedError> {
        let mut state = self.lock_state();
        let outcome = state.apply(request, result);
        self.publish(&state);
        outcome
    }

    pub(crate) fn abandon(&self, request: &PageRequest) {
        let mut state = self.lock_state();
        state.abandon(request);
        self.publish(&state);
    }

    pub(crate) fn is_current(&self, request: &PageRequest) -> bool {
        self.lock_state().generation() == request.generation
    }

    async fn fetch_and_apply(&self, request: PageRequest) -> Result<LoadOutcome, FeedError> {
        let page_size = self.page_size();
        let result = self
            .catalog
            .fetch_page(&request.context, request.page, page_size)
            .await;
        self.apply(&request, result)
    }

    fn publish(&self, state: &FeedState) {
        self.snapshots.send_replace(state.snapshot());
    }

    fn lock_state(&self) -> MutexGuard<'_, FeedState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
