use serde::{Serialize, Deserialize};

/// A 1-indexed page of fixed size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWindow {
    pub page: usize,
    pub page_size: usize,
}

impl PageWindow {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    /// Offset of the first record on this page
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) * self.page_size
    }
}
