//! Page navigation engine

use super::{PageContext, PageSubscriber, ViewMode};
use std::sync::{Arc, Weak};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

/// Rejected navigation requests
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Pages are numbered from 1")]
    PageZero,

    #[error("Page {page} out of bounds (last page: {last})")]
    OutOfBounds { page: usize, last: usize },

    #[error("Already at first page")]
    AtStart,
}

/// Navigation state stored internally
#[derive(Debug, Clone)]
struct NavigationState {
    mode: ViewMode,
    page: usize,
    page_size: usize,
    catalog_total: usize,
    selection_total: usize,
}

impl NavigationState {
    fn total_records(&self) -> usize {
        match self.mode {
            ViewMode::Browsing => self.catalog_total,
            ViewMode::ReviewingSelection => self.selection_total,
        }
    }
}

/// Tracks the current page and view mode of the table
pub struct PageNavigator {
    state: Arc<RwLock<NavigationState>>,
    subscribers: Arc<RwLock<Vec<Weak<dyn PageSubscriber>>>>,
}

impl PageNavigator {
    /// Create a navigator on page 1 in browsing mode
    pub fn new(page_size: usize) -> Self {
        let state = NavigationState {
            mode: ViewMode::Browsing,
            page: 1,
            page_size,
            catalog_total: 0,
            selection_total: 0,
        };

        Self {
            state: Arc::new(RwLock::new(state)),
            subscribers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Record the catalog total reported by the last list response
    pub fn set_catalog_total(&self, total: usize) {
        let mut state = self.state.write();
        if state.catalog_total == total {
            return;
        }
        state.catalog_total = total;
        drop(state);
        self.notify_subscribers();
    }

    /// Record the current selection size
    pub fn set_selection_total(&self, total: usize) {
        let mut state = self.state.write();
        if state.selection_total == total {
            return;
        }
        state.selection_total = total;
        drop(state);
        self.notify_subscribers();
    }

    /// Navigate to a specific page.
    ///
    /// Pages past the end are only rejected once the total is known, so the
    /// first browse of a fresh session can reach any page.
    pub fn seek_to(&self, page: usize) -> Result<(), NavigationError> {
        if page == 0 {
            return Err(NavigationError::PageZero);
        }

        let mut state = self.state.write();
        let total = state.total_records();
        let last = crate::model::pages_for(total, state.page_size).max(1);
        // Review pages past the selection render empty
        let bounded = state.mode == ViewMode::Browsing && total > 0;
        if bounded && page > last {
            debug!("Rejected page {} of {} in {:?}", page, last, state.mode);
            return Err(NavigationError::OutOfBounds { page, last });
        }
        state.page = page;

        drop(state);
        self.notify_subscribers();
        Ok(())
    }

    /// Navigate forward by one page
    pub fn next(&self) -> Result<(), NavigationError> {
        let page = self.state.read().page;
        self.seek_to(page + 1)
    }

    /// Navigate backward by one page
    pub fn previous(&self) -> Result<(), NavigationError> {
        let page = self.state.read().page;
        if page <= 1 {
            return Err(NavigationError::AtStart);
        }
        self.seek_to(page - 1)
    }

    /// Switch mode, returning to page 1 when it changes
    pub fn set_mode(&self, mode: ViewMode) -> bool {
        let mut state = self.state.write();
        if state.mode == mode {
            return false;
        }
        debug!("View mode {:?} -> {:?}", state.mode, mode);
        state.mode = mode;
        state.page = 1;

        drop(state);
        self.notify_subscribers();
        true
    }

    pub fn mode(&self) -> ViewMode {
        self.state.read().mode
    }

    pub fn page(&self) -> usize {
        self.state.read().page
    }

    pub fn page_size(&self) -> usize {
        self.state.read().page_size
    }

    pub fn catalog_total(&self) -> usize {
        self.state.read().catalog_total
    }

    /// Get current page context
    pub fn get_context(&self) -> PageContext {
        let state = self.state.read();
        PageContext {
            mode: state.mode,
            page: state.page,
            page_size: state.page_size,
            total_records: state.total_records(),
        }
    }

    /// Add a subscriber
    pub fn add_subscriber(&self, subscriber: Arc<dyn PageSubscriber>) {
        let mut subscribers = self.subscribers.write();
        subscribers.push(Arc::downgrade(&subscriber));
    }

    /// Notify all subscribers of a page change
    fn notify_subscribers(&self) {
        let context = self.get_context();
        let mut subscribers = self.subscribers.write();

        // Remove any dead weak references
        subscribers.retain(|weak| weak.strong_count() > 0);

        for weak in subscribers.iter() {
            if let Some(subscriber) = weak.upgrade() {
                subscriber.on_page_change(&context);
            }
        }
    }
}
