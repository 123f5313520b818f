//! Core of the MangaHub client: catalog access, paginated feeds, debounced
//! search and the two locally persisted user lists.

pub mod alert;
pub mod bindings;
pub mod cancellation;
pub mod catalog;
pub mod config;
pub mod library;
pub mod membership;
pub mod model;
pub mod pagination;
pub mod search;
pub mod shelves;
pub mod store;

pub use alert::AlertView;
pub use bindings::export_ts_bindings;
pub use catalog::{CatalogClient, CatalogClientConfig, CatalogError, CatalogQuery, CatalogSource, Taxonomy};
pub use config::AppConfig;
pub use membership::{Membership, MembershipCoordinator, MembershipError};
pub use model::{Title, TitleId, UserTitle};
pub use pagination::{FeedError, FeedSnapshot, LoadOutcome, Paginator};
pub use search::{SearchCoordinator, SearchSnapshot, SearchStatus};
pub use shelves::{CategoryShelves, ShelfError};
pub use store::{ListName, ListStore, StoreError};
