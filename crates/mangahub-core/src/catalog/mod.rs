//! Read-only access to the remote manga catalog.
//!
//! Coordinators depend on the [`CatalogSource`] trait; [`CatalogClient`] is the
//! HTTP implementation used by the binary.

mod client;
mod query;

pub use client::{CatalogClient, CatalogClientConfig};
pub use query::{CatalogQuery, Taxonomy};

use crate::alert::AlertView;
use crate::model::{Author, Title};
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("no response from {url}: {message}")]
    Transport { url: String, message: String },
    #[error("catalog answered HTTP {code} for {url}")]
    Status { url: String, code: u16 },
    #[error("malformed catalog payload from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("invalid catalog endpoint: {0}")]
    InvalidEndpoint(String),
}

impl CatalogError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport_error",
            Self::Status { .. } => "status_error",
            Self::Decode { .. } => "decode_error",
            Self::InvalidEndpoint(_) => "invalid_endpoint",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { .. } => "We did not get any response from the server, check your internet connection and try again.".to_string(),
            Self::Status { code, .. } => format!("Error {code}"),
            Self::Decode { .. } => "The catalog sent data we could not read.".to_string(),
            Self::InvalidEndpoint(_) => "The catalog address is not configured correctly.".to_string(),
        }
    }

    pub fn to_alert(&self) -> AlertView {
        AlertView::new(self.code(), self.user_message())
    }
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// One page of titles for `query`. Pages start at 1.
    async fn fetch_page(
        &self,
        query: &CatalogQuery,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Title>, CatalogError>;

    async fn fetch_taxonomy(&self, taxonomy: Taxonomy) -> Result<Vec<String>, CatalogError>;

    async fn fetch_authors(&self) -> Result<Vec<Author>, CatalogError>;
}
