//! Debounced free-text search on top of a shared [`Paginator`].
//!
//! Every keystroke cancels the previous pending search and schedules a new
//! one after the debounce window. Only the most recently scheduled search can
//! apply results; the rest are discarded whole.

use crate::alert::AlertView;
use crate::cancellation::CancellationToken;
use crate::catalog::{CatalogError, CatalogQuery, CatalogSource};
use crate::pagination::{FeedError, LoadOutcome, PageRequest, Paginator};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use ts_rs::TS;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("search for `{query}` failed: {source}")]
    Failed { query: String, source: CatalogError },
}

impl SearchError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Failed { .. } => "search_failed",
        }
    }

    pub fn to_alert(&self) -> AlertView {
        AlertView::new(self.code(), "Error loading your search")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SearchStatus {
    Inactive,
    Pending,
    Results,
    NoResults,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SearchSnapshot {
    pub query_text: String,
    pub active: bool,
    pub status: SearchStatus,
    pub search_succeeded: bool,
    #[ts(type = "number")]
    pub request_id: u64,
    pub alert: Option<AlertView>,
}

impl Default for SearchSnapshot {
    fn default() -> Self {
        Self {
            query_text: String::new(),
            active: false,
            status: SearchStatus::Inactive,
            search_succeeded: true,
            request_id: 0,
            alert: None,
        }
    }
}

struct PendingSearch {
    request: PageRequest,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

struct SearchInner<C: CatalogSource + ?Sized> {
    feed: Arc<Paginator<C>>,
    debounce: Duration,
    pending: Mutex<Option<PendingSearch>>,
    snapshots: watch::Sender<SearchSnapshot>,
}

pub struct SearchCoordinator<C: CatalogSource + ?Sized + 'static> {
    inner: Arc<SearchInner<C>>,
}

impl<C: CatalogSource + ?Sized + 'static> SearchCoordinator<C> {
    pub fn new(feed: Arc<Paginator<C>>, debounce: Duration) -> Self {
        let (snapshots, _) = watch::channel(SearchSnapshot::default());
        Self {
            inner: Arc::new(SearchInner {
                feed,
                debounce,
                pending: Mutex::new(None),
                snapshots,
            }),
        }
    }

    pub fn feed(&self) -> &Arc<Paginator<C>> {
        &self.inner.feed
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// React to an edit of the search field.
    ///
    /// Blank text returns the feed to all titles and awaits its first page.
    /// Anything else clears the feed and schedules a debounced fetch; the
    /// call returns as soon as the search is scheduled.
    pub async fn on_query_text_changed(&self, text: &str) -> Result<LoadOutcome, FeedError> {
        let text = text.trim();
        if !text.is_empty() {
            self.schedule(text);
            return Ok(LoadOutcome::Busy);
        }

        if let Some(previous) = self.inner.lock_pending().take() {
            debug!(request_id = previous.request.generation, "Cancelling pending search");
            previous.token.cancel();
        }
        self.inner.snapshots.send_replace(SearchSnapshot::default());
        info!("Search cleared; showing all titles");
        self.inner.feed.reset(CatalogQuery::AllTitles).await
    }

    fn schedule(&self, text: &str) {
        let mut pending = self.inner.lock_pending();
        if let Some(previous) = pending.take() {
            debug!(request_id = previous.request.generation, "Cancelling pending search");
            previous.token.cancel();
        }

        let request = self
            .inner
            .feed
            .begin_context(CatalogQuery::SearchText(text.to_string()));
        let token = CancellationToken::new();
        self.inner.snapshots.send_replace(SearchSnapshot {
            query_text: text.to_string(),
            active: true,
            status: SearchStatus::Pending,
            search_succeeded: true,
            request_id: request.generation,
            alert: None,
        });
        debug!(
            request_id = request.generation,
            query = text,
            debounce_ms = self.inner.debounce.as_millis() as u64,
            "Search scheduled"
        );

        let handle = tokio::spawn(run_search(
            self.inner.clone(),
            request.clone(),
            token.clone(),
        ));
        *pending = Some(PendingSearch {
            request,
            token,
            handle: Some(handle),
        });
    }

    /// Drop any pending search without applying its results.
    pub fn cancel(&self) {
        let Some(previous) = self.inner.lock_pending().take() else {
            return;
        };
        previous.token.cancel();
        self.inner.feed.abandon(&previous.request);
        self.inner.snapshots.send_modify(|snapshot| {
            if snapshot.status == SearchStatus::Pending {
                snapshot.status = SearchStatus::Inactive;
            }
        });
        info!(request_id = previous.request.generation, "Search cancelled");
    }

    /// Re-request the search page that failed last.
    ///
    /// Goes through the same bookkeeping as a scheduled search, so a retry
    /// that succeeds clears the failure from the search snapshot. Outside an
    /// active search this is a plain feed retry.
    pub async fn retry(&self) -> Result<LoadOutcome, FeedError> {
        if !self.inner.snapshots.borrow().active {
            return self.inner.feed.retry().await;
        }
        let Some(request) = self.inner.feed.begin_retry() else {
            return Ok(LoadOutcome::NothingToRetry);
        };

        let token = CancellationToken::new();
        {
            let mut pending = self.inner.lock_pending();
            if let Some(previous) = pending.take() {
                previous.token.cancel();
            }
            *pending = Some(PendingSearch {
                request: request.clone(),
                token: token.clone(),
                handle: None,
            });
        }
        self.inner.snapshots.send_modify(|snapshot| {
            snapshot.status = SearchStatus::Pending;
            snapshot.alert = None;
        });
        info!(request_id = request.generation, page = request.page, "Retrying search");

        let page_size = self.inner.feed.page_size();
        let result = self
            .inner
            .feed
            .catalog()
            .fetch_page(&request.context, request.page, page_size)
            .await;
        if let Err(cancelled) = token.check_cancelled("retry") {
            debug!(request_id = request.generation, "{cancelled}");
            return Ok(LoadOutcome::Stale);
        }
        let outcome = self.inner.feed.apply(&request, result);
        if outcome == Ok(LoadOutcome::Stale) {
            self.inner.abandon_replaced(&request);
        } else {
            self.inner.finish(&request, outcome.clone());
        }
        outcome
    }

    /// Wait for the currently scheduled search, if any, to finish.
    pub async fn settle(&self) {
        let handle = self
            .inner
            .lock_pending()
            .as_mut()
            .and_then(|pending| pending.handle.take());
        let Some(handle) = handle else {
            return;
        };
        if let Err(err) = handle.await {
            warn!("Search task ended abnormally: {err}");
        }
    }
}

impl<C: CatalogSource + ?Sized> SearchInner<C> {
    fn lock_pending(&self) -> MutexGuard<'_, Option<PendingSearch>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finish(&self, request: &PageRequest, outcome: Result<LoadOutcome, FeedError>) {
        let mut pending = self.lock_pending();
        let is_latest = pending
            .as_ref()
            .is_some_and(|current| current.request.generation == request.generation);
        if !is_latest || outcome == Ok(LoadOutcome::Stale) {
            debug!(request_id = request.generation, "Ignoring stale search results");
            return;
        }
        *pending = None;

        let has_items = !self.feed.snapshot().items.is_empty();
        self.snapshots.send_modify(|snapshot| match outcome {
            Ok(_) if has_items => {
                snapshot.status = SearchStatus::Results;
                snapshot.search_succeeded = true;
                snapshot.alert = None;
            }
            Ok(_) => {
                snapshot.status = SearchStatus::NoResults;
                snapshot.search_succeeded = false;
                snapshot.alert = None;
            }
            Err(FeedError::FetchFailed { source, .. }) => {
                let err = SearchError::Failed {
                    query: snapshot.query_text.clone(),
                    source,
                };
                warn!(request_id = request.generation, "{err}");
                snapshot.status = SearchStatus::Failed;
                snapshot.search_succeeded = false;
                snapshot.alert = Some(err.to_alert());
            }
        });
        debug!(
            request_id = request.generation,
            status = ?self.snapshots.borrow().status,
            "Search finished"
        );
    }

    /// Settle a search whose feed was switched to another context under it.
    fn abandon_replaced(&self, request: &PageRequest) {
        let mut pending = self.lock_pending();
        let is_latest = pending
            .as_ref()
            .is_some_and(|current| current.request.generation == request.generation);
        if !is_latest {
            return;
        }
        *pending = None;
        self.snapshots.send_modify(|snapshot| {
            snapshot.active = false;
            snapshot.status = SearchStatus::Inactive;
            snapshot.search_succeeded = true;
            snapshot.alert = None;
        });
        debug!(request_id = request.generation, "Search dropped; feed was replaced");
    }
}

async fn run_search<C: CatalogSource + ?Sized>(
    inner: Arc<SearchInner<C>>,
    request: PageRequest,
    token: CancellationToken,
) {
    tokio::time::sleep(inner.debounce).await;
    if let Err(cancelled) = token.check_cancelled("debounce") {
        debug!(request_id = request.generation, "{cancelled}");
        return;
    }
    if !inner.feed.is_current(&request) {
        inner.abandon_replaced(&request);
        return;
    }

    let page_size = inner.feed.page_size();
    let result = inner
        .feed
        .catalog()
        .fetch_page(&request.context, request.page, page_size)
        .await;

    if let Err(cancelled) = token.check_cancelled("fetch") {
        debug!(request_id = request.generation, "{cancelled}");
        return;
    }
    match inner.feed.apply(&request, result) {
        Ok(LoadOutcome::Stale) => inner.abandon_replaced(&request),
        outcome => inner.finish(&request, outcome),
    }
}
