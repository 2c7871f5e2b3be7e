//! Cross-page selection engine for the artwork table
//!
//! The dispatcher grows the selection set to a requested size against the
//! paginated catalog, the controller decides which page slice the grid shows,
//! and [`CatalogSession`] exposes both to the surrounding UI.

pub mod controller;
pub mod dispatcher;
pub mod policy;
pub mod session;
mod strategies;

use at_core::navigation::NavigationError;
use at_core::{FetchError, NoticeLevel};
use thiserror::Error;

pub use controller::{PageView, PageViewController};
pub use dispatcher::{parse_target, BulkSelectOutcome, BulkSelectRequest, SelectionDispatcher};
pub use policy::{SelectionPolicy, Strategy};
pub use session::CatalogSession;

/// Rejected bulk-select input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{0}' is not a whole number")]
    NotANumber(String),

    #[error("Enter a number greater than zero")]
    NotPositive,

    #[error("{current} artworks are already selected, nothing to add for a target of {target}")]
    AlreadySatisfied { target: usize, current: usize },
}

/// Errors raised by a bulk selection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Cannot select {requested} artworks, only {available} are available")]
    Capacity { requested: usize, available: usize },

    #[error("A bulk selection is already running")]
    Busy,

    #[error("Selection aborted: {0}")]
    Aborted(#[from] FetchError),
}

impl SelectError {
    /// Severity of the notice shown for this error
    pub fn notice_level(&self) -> NoticeLevel {
        match self {
            SelectError::Validation(ValidationError::AlreadySatisfied { .. }) => NoticeLevel::Info,
            SelectError::Validation(_) => NoticeLevel::Warning,
            SelectError::Capacity { .. } => NoticeLevel::Warning,
            SelectError::Busy => NoticeLevel::Info,
            SelectError::Aborted(_) => NoticeLevel::Error,
        }
    }
}

/// Errors raised while producing a page for the grid
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error("Could not load page: {0}")]
    Fetch(#[from] FetchError),
}
