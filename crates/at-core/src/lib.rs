//! Core functionality for the artwork table
//!
//! This crate provides the record model, the cross-page selection set and the
//! page navigation state shared by the data and selection crates.

pub mod events;
pub mod model;
pub mod navigation;
pub mod progress;
pub mod selection;

use thiserror::Error;

// Re-export commonly used types
pub use events::{EventBus, Notice, NoticeLevel};
pub use model::{FieldSet, ListPage, Record, RecordId};
pub use navigation::{PageContext, PageNavigator, PageSubscriber, ViewMode};
pub use progress::SelectionProgress;
pub use selection::{ReconcileDelta, SelectionSet};
pub use data::CatalogSource;

/// Errors raised while talking to the remote catalog
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Catalog responded with status {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("Malformed catalog response: {0}")]
    Decode(String),
}

pub mod data {
    use crate::model::{FieldSet, ListPage, Record, RecordId};
    use crate::FetchError;

    /// Trait for catalog sources
    #[async_trait::async_trait]
    pub trait CatalogSource: Send + Sync {
        /// Fetch one page of the catalog
        async fn list_page(
            &self,
            page: usize,
            page_size: usize,
            fields: FieldSet,
        ) -> Result<ListPage, FetchError>;

        /// Fetch records by identifier; unknown ids are omitted
        async fn fetch_by_ids(
            &self,
            ids: &[RecordId],
            fields: FieldSet,
        ) -> Result<Vec<Record>, FetchError>;

        /// Get the source name/endpoint
        fn source_name(&self) -> &str;
    }
}
