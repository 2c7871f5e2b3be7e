//! Session state and the callbacks exposed to the table UI

use std::sync::Arc;
use at_core::events::events::{PageRendered, SelectionChanged, ViewModeChanged};
use at_core::{CatalogSource, EventBus, Notice, PageNavigator, ReconcileDelta, RecordId, SelectionSet, ViewMode};
use at_data::{CacheStats, CatalogConfig, CatalogGateway, DataError, PageCache};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::controller::{PageView, PageViewController};
use crate::dispatcher::{parse_target, BulkSelectOutcome, BulkSelectRequest, SelectionDispatcher};
use crate::policy::Strategy;
use crate::{SelectError, ViewError};

/// One table session: the selection, the page view and the bulk selector
/// sharing a gateway and an event bus.
pub struct CatalogSession {
    config: CatalogConfig,
    gateway: Arc<CatalogGateway>,
    selection: Arc<RwLock<SelectionSet>>,
    events: Arc<EventBus>,
    controller: PageViewController,
    dispatcher: SelectionDispatcher,
}

impl CatalogSession {
    /// Create a session over the public HTTP catalog
    pub fn from_config(config: CatalogConfig) -> Result<Self, DataError> {
        config.validate()?;
        let gateway = at_data::http_gateway(&config)?;
        Ok(Self::with_gateway(config, Arc::new(gateway)))
    }

    /// Create a session over any catalog source
    pub fn new(config: CatalogConfig, source: Arc<dyn CatalogSource>) -> Self {
        let cache = PageCache::new(config.cache_ttl);
        Self::with_gateway(config, Arc::new(CatalogGateway::new(source, cache)))
    }

    /// Create a session around an existing gateway
    pub fn with_gateway(config: CatalogConfig, gateway: Arc<CatalogGateway>) -> Self {
        let events = Arc::new(EventBus::new());
        let selection = Arc::new(RwLock::new(SelectionSet::new()));
        let navigator = Arc::new(PageNavigator::new(config.page_size));

        let controller = PageViewController::new(gateway.clone(), navigator, selection.clone());
        let dispatcher = SelectionDispatcher::new(
            gateway.clone(),
            events.clone(),
            config.page_size,
            &config.selection,
        );

        Self {
            config,
            gateway,
            selection,
            events,
            controller,
            dispatcher,
        }
    }

    /// The grid asks for `page` of the current mode
    pub async fn on_page_requested(&self, page: usize) -> Result<PageView, ViewError> {
        let result = self.controller.show_page(page).await;
        self.publish_view(&result);
        result
    }

    /// The grid's next-page control
    pub async fn on_next_page_requested(&self) -> Result<PageView, ViewError> {
        let result = self.controller.next_page().await;
        self.publish_view(&result);
        result
    }

    /// The grid's previous-page control
    pub async fn on_previous_page_requested(&self) -> Result<PageView, ViewError> {
        let result = self.controller.previous_page().await;
        self.publish_view(&result);
        result
    }

    /// The grid reports the checked rows of the visible page
    pub fn on_selection_toggled(&self, visible_ids: &[RecordId], checked_ids: &[RecordId]) -> ReconcileDelta {
        let (delta, size) = {
            let mut selection = self.selection.write();
            let delta = selection.reconcile(visible_ids, checked_ids);
            (delta, selection.size())
        };

        if !delta.is_empty() {
            self.controller.sync_selection_total();
            self.events.publish(SelectionChanged { size });
        }
        delta
    }

    /// The user asked for `target_text` selected artworks in total.
    ///
    /// Every outcome is also reported as a notice on the event bus. When the
    /// bulk-id strategy completes the view switches to the selection.
    pub async fn on_bulk_select_requested(&self, target_text: &str) -> Result<BulkSelectOutcome, SelectError> {
        let result = self.bulk_select(target_text).await;

        match &result {
            Ok(outcome) => {
                self.events.publish(Notice::success(Self::success_message(outcome)));
                if outcome.strategy == Strategy::BulkId {
                    self.show_bulk_preview(outcome);
                }
            }
            Err(e) => {
                let notice = Notice::new(e.notice_level(), e.to_string());
                self.events.publish(notice);
            }
        }
        result
    }

    /// Empty the selection and go back to browsing
    pub fn on_clear_selection_requested(&self) {
        self.selection.write().clear();
        self.controller.sync_selection_total();
        self.events.publish(SelectionChanged { size: 0 });

        if self.controller.set_mode(ViewMode::Browsing) {
            self.events.publish(ViewModeChanged { mode: ViewMode::Browsing });
        }
        self.events.publish(Notice::info("Selection cleared"));
        info!("Selection cleared");
    }

    /// Explicit switch between browsing and reviewing, loads page 1 of the new mode
    pub async fn on_view_mode_toggled(&self) -> Result<PageView, ViewError> {
        let mode = self.controller.toggle_mode();
        self.events.publish(ViewModeChanged { mode });
        let result = self.controller.render_current().await;
        self.publish_view(&result);
        result
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn controller(&self) -> &PageViewController {
        &self.controller
    }

    pub fn dispatcher(&self) -> &SelectionDispatcher {
        &self.dispatcher
    }

    pub fn selection_size(&self) -> usize {
        self.selection.read().size()
    }

    pub fn is_selected(&self, id: RecordId) -> bool {
        self.selection.read().has(id)
    }

    /// Selected ids in stable order
    pub fn selected_ids(&self) -> Vec<RecordId> {
        self.selection.read().iter().collect()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.gateway.cache_stats()
    }

    async fn bulk_select(&self, target_text: &str) -> Result<BulkSelectOutcome, SelectError> {
        let target = parse_target(target_text)?;
        let request = BulkSelectRequest {
            target,
            current_page: self.controller.browse_page(),
            total_records: self.controller.catalog_total(),
        };
        let outcome = self.dispatcher.run(request, &self.selection).await;
        self.controller.sync_selection_total();
        outcome
    }

    fn show_bulk_preview(&self, outcome: &BulkSelectOutcome) {
        if self.controller.set_mode(ViewMode::ReviewingSelection) {
            self.events.publish(ViewModeChanged { mode: ViewMode::ReviewingSelection });
        }
        let rows = outcome.preview.as_ref().map(Vec::len).unwrap_or(0);
        self.events.publish(PageRendered {
            mode: ViewMode::ReviewingSelection,
            page: 1,
            rows,
        });
    }

    fn success_message(outcome: &BulkSelectOutcome) -> String {
        if outcome.shortfall() > 0 && !outcome.failed_pages.is_empty() {
            format!(
                "Selected {} of {} requested artworks ({} pages could not be loaded)",
                outcome.selected_after,
                outcome.target,
                outcome.failed_pages.len()
            )
        } else if outcome.shortfall() > 0 {
            format!("Selected {} of {} requested artworks", outcome.selected_after, outcome.target)
        } else {
            format!("Selected {} artworks", outcome.selected_after)
        }
    }

    fn publish_view(&self, result: &Result<PageView, ViewError>) {
        match result {
            Ok(view) => self.events.publish(PageRendered {
                mode: view.mode,
                page: view.page,
                rows: view.records.len(),
            }),
            Err(e) => {
                warn!("Page request failed: {}", e);
                self.events.publish(Notice::error(e.to_string()));
            }
        }
    }
}
