use serde::{Serialize, Deserialize};

mod engine;
mod position;
mod subscriber;

pub use engine::{NavigationError, PageNavigator};
pub use position::PageWindow;
pub use subscriber::PageSubscriber;

/// What the table is currently paging through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ViewMode {
    /// Sequential pages of the full catalog
    #[default]
    Browsing,
    /// Pages sliced from the selection set's membership
    ReviewingSelection,
}

/// Context passed to subscribers after a page or mode change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub mode: ViewMode,
    pub page: usize,
    pub page_size: usize,
    /// Records available in the current mode (catalog total or selection size)
    pub total_records: usize,
}

impl PageContext {
    /// Number of pages in the current mode, at least one
    pub fn total_pages(&self) -> usize {
        crate::model::pages_for(self.total_records, self.page_size).max(1)
    }

    /// Window of the current page
    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.page, self.page_size)
    }
}
