//! Page subscriber trait

use super::PageContext;

/// Trait for components that need to respond to page changes
pub trait PageSubscriber: Send + Sync {
    /// Called when the page number, mode or record total changes
    fn on_page_change(&self, context: &PageContext);
}
