//! One paginated row per genre, theme or demographic.

use crate::alert::AlertView;
use crate::catalog::{CatalogError, CatalogSource, Taxonomy};
use crate::model::TitleId;
use crate::pagination::{FeedError, FeedSnapshot, LoadOutcome, Paginator};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShelfError {
    #[error("failed to list {taxonomy}: {source}")]
    TaxonomyFailed {
        taxonomy: Taxonomy,
        source: CatalogError,
    },
    #[error("no shelf named `{0}`")]
    UnknownShelf(String),
    #[error(transparent)]
    Page(#[from] FeedError),
}

impl ShelfError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TaxonomyFailed { .. } => "taxonomy_failed",
            Self::UnknownShelf(_) => "unknown_shelf",
            Self::Page(err) => err.code(),
        }
    }

    pub fn to_alert(&self) -> AlertView {
        match self {
            Self::TaxonomyFailed { source, .. } => AlertView::new(self.code(), source.user_message()),
            Self::UnknownShelf(name) => AlertView::new(self.code(), format!("No category named {name}")),
            Self::Page(err) => err.to_alert(),
        }
    }
}

struct Shelf<C: CatalogSource + ?Sized> {
    name: String,
    feed: Arc<Paginator<C>>,
}

impl<C: CatalogSource + ?Sized> Clone for Shelf<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            feed: self.feed.clone(),
        }
    }
}

/// Category browser: each shelf keeps its own page cursor.
pub struct CategoryShelves<C: CatalogSource + ?Sized + 'static> {
    catalog: Arc<C>,
    page_size: u32,
    shelves: Mutex<(Option<Taxonomy>, Vec<Shelf<C>>)>,
}

impl<C: CatalogSource + ?Sized + 'static> CategoryShelves<C> {
    pub fn new(catalog: Arc<C>, page_size: u32) -> Self {
        Self {
            catalog,
            page_size,
            shelves: Mutex::new((None, Vec::new())),
        }
    }

    /// Replace the shelves with one per `taxonomy` name and load each first page.
    ///
    /// A shelf whose first page fails keeps the error in its own snapshot;
    /// only a failure to list the names fails the whole call.
    pub async fn load(&self, taxonomy: Taxonomy) -> Result<Vec<String>, ShelfError> {
        let names = self
            .catalog
            .fetch_taxonomy(taxonomy)
            .await
            .map_err(|source| {
                warn!(%taxonomy, code = source.code(), "Failed to list categories: {source}");
                ShelfError::TaxonomyFailed { taxonomy, source }
            })?;

        let shelves: Vec<Shelf<C>> = names
            .iter()
            .map(|name| Shelf {
                name: name.clone(),
                feed: Arc::new(Paginator::new(
                    self.catalog.clone(),
                    taxonomy.query_for(name),
                    self.page_size,
                )),
            })
            .collect();
        *self.lock_shelves() = (Some(taxonomy), shelves.clone());
        info!(%taxonomy, count = shelves.len(), "Loading category shelves");

        let mut tasks = JoinSet::new();
        for shelf in shelves {
            tasks.spawn(async move {
                let context = shelf.feed.snapshot().context;
                let outcome = shelf.feed.reset(context).await;
                (shelf.name, outcome)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, Ok(outcome))) => debug!(shelf = %name, ?outcome, "Shelf loaded"),
                Ok((name, Err(err))) => warn!(shelf = %name, "Shelf failed to load: {err}"),
                Err(err) => warn!("Shelf task ended abnormally: {err}"),
            }
        }
        Ok(names)
    }

    pub async fn on_item_appeared(&self, name: &str, last_visible: TitleId) -> Result<LoadOutcome, ShelfError> {
        let feed = self
            .shelf(name)
            .ok_or_else(|| ShelfError::UnknownShelf(name.to_string()))?;
        Ok(feed.on_item_appeared(last_visible).await?)
    }

    pub async fn retry(&self, name: &str) -> Result<LoadOutcome, ShelfError> {
        let feed = self
            .shelf(name)
            .ok_or_else(|| ShelfError::UnknownShelf(name.to_string()))?;
        Ok(feed.retry().await?)
    }

    pub fn taxonomy(&self) -> Option<Taxonomy> {
        self.lock_shelves().0
    }

    pub fn shelf(&self, name: &str) -> Option<Arc<Paginator<C>>> {
        self.lock_shelves()
            .1
            .iter()
            .find(|shelf| shelf.name == name)
            .map(|shelf| shelf.feed.clone())
    }

    /// Shelf names with their current feed state, in catalog order.
    pub fn snapshots(&self) -> Vec<(String, FeedSnapshot)> {
        self.lock_shelves()
            .1
            .iter()
            .map(|shelf| (shelf.name.clone(), shelf.feed.snapshot()))
            .collect()
    }

    fn lock_shelves(&self) -> MutexGuard<'_, (Option<Taxonomy>, Vec<Shelf<C>>)> {
        self.shelves
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogQuery;
    use crate::catalog::fake::{FakeCatalog, unreachable};
    use crate::model::fixtures::title;

    fn genre(name: &str) -> CatalogQuery {
        CatalogQuery::ByGenre(name.to_string())
    }

    fn ids(snapshot: &FeedSnapshot) -> Vec<TitleId> {
        snapshot.items.iter().map(|t| t.id).collect()
    }

    #[tokio::test]
    async fn loads_one_shelf_per_name() {
        let catalog = Arc::new(
            FakeCatalog::default()
                .with_taxonomy(Taxonomy::Genres, &["Action", "Horror"])
                .with_page(genre("Action"), 1, vec![title(1, "Berserk", None)])
                .with_page(genre("Horror"), 1, vec![title(2, "Uzumaki", Some(3))]),
        );
        let shelves = CategoryShelves::new(catalog, 10);

        let names = shelves.load(Taxonomy::Genres).await.unwrap();

        assert_eq!(names, vec!["Action", "Horror"]);
        assert_eq!(shelves.taxonomy(), Some(Taxonomy::Genres));
        let snapshots = shelves.snapshots();
        assert_eq!(snapshots[0].0, "Action");
        assert_eq!(ids(&snapshots[0].1), vec![1]);
        assert_eq!(ids(&snapshots[1].1), vec![2]);
    }

    #[tokio::test]
    async fn shelves_page_independently() {
        let catalog = Arc::new(
            FakeCatalog::default()
                .with_taxonomy(Taxonomy::Themes, &["Gore", "Music"])
                .with_page(CatalogQuery::ByTheme("Gore".into()), 1, vec![title(1, "A", None)])
                .with_page(CatalogQuery::ByTheme("Gore".into()), 2, vec![title(3, "C", None)])
                .with_page(CatalogQuery::ByTheme("Music".into()), 1, vec![title(2, "B", None)]),
        );
        let shelves = CategoryShelves::new(catalog, 1);
        shelves.load(Taxonomy::Themes).await.unwrap();

        let outcome = shelves.on_item_appeared("Gore", 1).await.unwrap();

        assert_eq!(outcome, LoadOutcome::Loaded { appended: 1 });
        let gore = shelves.shelf("Gore").unwrap().snapshot();
        let music = shelves.shelf("Music").unwrap().snapshot();
        assert_eq!((gore.page, ids(&gore)), (2, vec![1, 3]));
        assert_eq!((music.page, ids(&music)), (1, vec![2]));
    }

    #[tokio::test]
    async fn taxonomy_failure_is_reported() {
        let shelves = CategoryShelves::new(Arc::new(FakeCatalog::default()), 10);

        let err = shelves.load(Taxonomy::Demographics).await.unwrap_err();

        assert_eq!(
            err,
            ShelfError::TaxonomyFailed {
                taxonomy: Taxonomy::Demographics,
                source: unreachable(),
            }
        );
        assert_eq!(err.code(), "taxonomy_failed");
        assert!(shelves.snapshots().is_empty());
    }

    #[tokio::test]
    async fn failed_shelf_keeps_its_own_alert() {
        let catalog = Arc::new(
            FakeCatalog::default()
                .with_taxonomy(Taxonomy::Genres, &["Action", "Drama"])
                .with_page(genre("Action"), 1, vec![title(1, "Berserk", None)])
                .with_failure(genre("Drama"), 1, unreachable()),
        );
        let shelves = CategoryShelves::new(catalog.clone(), 10);
        shelves.load(Taxonomy::Genres).await.unwrap();

        let drama = shelves.shelf("Drama").unwrap().snapshot();
        assert!(drama.alert.is_some());
        assert!(shelves.shelf("Action").unwrap().snapshot().alert.is_none());

        catalog.clear_failure(&genre("Drama"), 1);
        assert_eq!(
            shelves.retry("Drama").await.unwrap(),
            LoadOutcome::Exhausted
        );
    }

    #[tokio::test]
    async fn unknown_shelf_is_an_error() {
        let shelves = CategoryShelves::new(Arc::new(FakeCatalog::default()), 10);
        let err = shelves.on_item_appeared("Nope", 1).await.unwrap_err();
        assert_eq!(err, ShelfError::UnknownShelf("Nope".to_string()));
    }
}
