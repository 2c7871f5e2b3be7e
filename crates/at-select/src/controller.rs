//! Page view controller

use std::sync::Arc;
use ahash::AHashMap;
use arrow::record_batch::RecordBatch;
use at_core::{FieldSet, PageContext, PageNavigator, Record, RecordId, SelectionSet, ViewMode};
use at_data::{records_to_batch, CatalogGateway, DataError};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::ViewError;

/// Reorder fetched records to follow `ids`, dropping ids the catalog omitted
pub(crate) fn arrange_by_ids(ids: &[RecordId], records: Vec<Record>) -> Vec<Record> {
    let mut by_id: AHashMap<RecordId, Record> = records.into_iter().map(|r| (r.id, r)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

/// A page slice ready for the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub mode: ViewMode,
    pub page: usize,
    pub page_size: usize,
    /// Records available in this mode
    pub total_records: usize,
    pub records: Vec<Record>,
}

impl PageView {
    /// Identifiers of the visible rows, in row order
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_pages(&self) -> usize {
        at_core::model::pages_for(self.total_records, self.page_size).max(1)
    }

    /// Columnar form of the rows for the grid
    pub fn to_batch(&self) -> Result<RecordBatch, DataError> {
        records_to_batch(&self.records)
    }
}

/// Decides which record slice the grid renders.
///
/// In `Browsing` pages come straight from the catalog; in
/// `ReviewingSelection` they are sliced from the selection's stable order and
/// materialized by id.
pub struct PageViewController {
    gateway: Arc<CatalogGateway>,
    navigator: Arc<PageNavigator>,
    selection: Arc<RwLock<SelectionSet>>,
    /// Last catalog page shown while browsing
    browse_page: RwLock<usize>,
}

impl PageViewController {
    pub fn new(
        gateway: Arc<CatalogGateway>,
        navigator: Arc<PageNavigator>,
        selection: Arc<RwLock<SelectionSet>>,
    ) -> Self {
        Self {
            gateway,
            navigator,
            selection,
            browse_page: RwLock::new(1),
        }
    }

    /// Move to `page` in the current mode and load it
    pub async fn show_page(&self, page: usize) -> Result<PageView, ViewError> {
        self.sync_selection_total();
        let previous = self.navigator.page();
        self.navigator.seek_to(page)?;
        self.render_or_rollback(previous).await
    }

    pub async fn next_page(&self) -> Result<PageView, ViewError> {
        self.sync_selection_total();
        let previous = self.navigator.page();
        self.navigator.next()?;
        self.render_or_rollback(previous).await
    }

    pub async fn previous_page(&self) -> Result<PageView, ViewError> {
        self.sync_selection_total();
        let previous = self.navigator.page();
        self.navigator.previous()?;
        self.render_or_rollback(previous).await
    }

    /// Load the page the navigator points at
    pub async fn render_current(&self) -> Result<PageView, ViewError> {
        let context = self.navigator.get_context();
        match context.mode {
            ViewMode::Browsing => self.browse(context).await,
            ViewMode::ReviewingSelection => self.review(context).await,
        }
    }

    /// Switch mode, returns false if already in it
    pub fn set_mode(&self, mode: ViewMode) -> bool {
        self.sync_selection_total();
        self.navigator.set_mode(mode)
    }

    /// Flip between browsing and reviewing, returns the new mode
    pub fn toggle_mode(&self) -> ViewMode {
        let next = match self.navigator.mode() {
            ViewMode::Browsing => ViewMode::ReviewingSelection,
            ViewMode::ReviewingSelection => ViewMode::Browsing,
        };
        self.set_mode(next);
        next
    }

    pub fn mode(&self) -> ViewMode {
        self.navigator.mode()
    }

    /// Catalog page bulk selection starts from
    pub fn browse_page(&self) -> usize {
        *self.browse_page.read()
    }

    /// Catalog total from the last list response, zero until one arrives
    pub fn catalog_total(&self) -> usize {
        self.navigator.catalog_total()
    }

    pub fn context(&self) -> PageContext {
        self.navigator.get_context()
    }

    /// Build a review page from records already fetched by id
    pub fn review_view(&self, page: usize, records: Vec<Record>) -> PageView {
        PageView {
            mode: ViewMode::ReviewingSelection,
            page,
            page_size: self.navigator.page_size(),
            total_records: self.selection.read().size(),
            records,
        }
    }

    /// Keep the navigator's review bounds in step with the selection
    pub fn sync_selection_total(&self) {
        let size = self.selection.read().size();
        self.navigator.set_selection_total(size);
    }

    /// Render the new page; if it cannot be loaded the navigator goes back
    /// to the page that was last shown
    async fn render_or_rollback(&self, previous: usize) -> Result<PageView, ViewError> {
        let result = self.render_current().await;
        if result.is_err() {
            if let Err(e) = self.navigator.seek_to(previous) {
                warn!("Could not return to page {}: {}", previous, e);
            }
        }
        result
    }

    async fn browse(&self, context: PageContext) -> Result<PageView, ViewError> {
        let list = self
            .gateway
            .list_page(context.page, context.page_size, FieldSet::Full)
            .await?;
        self.navigator.set_catalog_total(list.total_count);
        *self.browse_page.write() = context.page;

        Ok(PageView {
            mode: ViewMode::Browsing,
            page: context.page,
            page_size: context.page_size,
            total_records: list.total_count,
            records: list.records,
        })
    }

    async fn review(&self, context: PageContext) -> Result<PageView, ViewError> {
        let window = context.window();
        let (ids, total) = {
            let selection = self.selection.read();
            (selection.slice(window.offset(), window.page_size), selection.size())
        };

        // The selection simply ran out; an empty page is not an error
        if ids.is_empty() {
            debug!("Selection page {} is empty", context.page);
            return Ok(self.review_view(context.page, Vec::new()));
        }

        let records = self.gateway.fetch_by_ids(&ids, FieldSet::Full).await?;
        Ok(PageView {
            mode: ViewMode::ReviewingSelection,
            page: context.page,
            page_size: context.page_size,
            total_records: total,
            records: arrange_by_ids(&ids, records),
        })
    }
}
