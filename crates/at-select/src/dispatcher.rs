//! Selection strategy dispatcher

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use at_core::events::events::{ProgressChanged, SelectionChanged, StrategyChosen};
use at_core::{EventBus, Record, RecordId, SelectionProgress, SelectionSet};
use at_data::{CatalogGateway, SelectionTuning};
use parking_lot::{Mutex, RwLock};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::policy::{SelectionPolicy, Strategy};
use crate::strategies::{self, RunState};
use crate::{SelectError, ValidationError};

/// Parse the user's target count
pub fn parse_target(text: &str) -> Result<usize, ValidationError> {
    let trimmed = text.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| ValidationError::NotANumber(trimmed.to_string()))?;
    if value <= 0 {
        return Err(ValidationError::NotPositive);
    }
    usize::try_from(value).map_err(|_| ValidationError::NotANumber(trimmed.to_string()))
}

/// Input of one bulk selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkSelectRequest {
    /// Requested total selection size
    pub target: usize,
    /// Catalog page the user is looking at
    pub current_page: usize,
    /// Records in the catalog, zero when unknown
    pub total_records: usize,
}

/// What a completed bulk selection did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkSelectOutcome {
    pub run_id: Uuid,
    pub strategy: Strategy,
    pub target: usize,
    pub selected_before: usize,
    pub selected_after: usize,
    /// Members this run added. Rows unchecked while the run was suspended can
    /// leave `selected_after` below `selected_before`
    pub added: usize,
    /// Pages requested from the gateway, in issue order
    pub pages_requested: Vec<usize>,
    /// Pages whose fetch failed and contributed nothing
    pub failed_pages: Vec<usize>,
    /// First page of the selection, fetched by the bulk-id strategy
    pub preview: Option<Vec<Record>>,
}

impl BulkSelectOutcome {
    /// Records short of the target, non-zero when pages failed or held
    /// already selected records
    pub fn shortfall(&self) -> usize {
        self.target.saturating_sub(self.selected_after)
    }
}

/// Clears the busy flag on every exit path
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Grows the selection set to a target size by picking one of four
/// population strategies and driving the gateway accordingly.
pub struct SelectionDispatcher {
    pub(crate) gateway: Arc<CatalogGateway>,
    events: Arc<EventBus>,
    policy: SelectionPolicy,
    pub(crate) page_size: usize,
    pub(crate) sequential_page_budget: usize,
    pub(crate) batch_size: usize,
    busy: AtomicBool,
    progress: Mutex<SelectionProgress>,
}

impl SelectionDispatcher {
    pub fn new(
        gateway: Arc<CatalogGateway>,
        events: Arc<EventBus>,
        page_size: usize,
        tuning: &SelectionTuning,
    ) -> Self {
        Self {
            gateway,
            events,
            policy: SelectionPolicy::from_tuning(tuning),
            page_size,
            sequential_page_budget: tuning.sequential_page_budget,
            batch_size: tuning.batch_size.max(1),
            busy: AtomicBool::new(false),
            progress: Mutex::new(SelectionProgress::new()),
        }
    }

    /// Whether a bulk selection is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Progress of the current or last run
    pub fn progress(&self) -> SelectionProgress {
        self.progress.lock().clone()
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Grow `selection` until it holds `request.target` members.
    ///
    /// Rejections leave the selection untouched. Existing members are never
    /// removed. Individual page failures are absorbed; only a failed current
    /// page, or an id collection in which every page failed, aborts the run,
    /// and members added before the abort are kept.
    pub async fn run(
        &self,
        request: BulkSelectRequest,
        selection: &RwLock<SelectionSet>,
    ) -> Result<BulkSelectOutcome, SelectError> {
        let _busy = BusyGuard::acquire(&self.busy).ok_or(SelectError::Busy)?;

        let selected_before = selection.read().size();
        Self::validate(&request, selected_before, self.page_size)?;

        let remaining = request.target - selected_before;
        let strategy = self.policy.choose(remaining);
        let run_id = Uuid::new_v4();

        self.events.publish(StrategyChosen {
            strategy: strategy.name(),
            remaining,
        });
        self.start_progress();

        let span = info_span!("bulk_select", run = %run_id, strategy = strategy.name());
        let mut run = RunState::new(remaining);
        let result = async {
            info!(
                "Selecting {} more artworks (target {}, page {}, catalog {})",
                remaining, request.target, request.current_page, request.total_records
            );
            match strategy {
                Strategy::Sequential => strategies::sequential(self, &request, selection, &mut run).await,
                Strategy::Hybrid => strategies::hybrid(self, &request, selection, &mut run).await,
                Strategy::ParallelBatched => strategies::batched(self, &request, selection, &mut run).await,
                Strategy::BulkId => strategies::bulk_id(self, &request, selection, &mut run).await,
            }
        }
        .instrument(span)
        .await;

        let selected_after = selection.read().size();
        match result {
            Ok(()) => {
                self.finish_progress();
                let outcome = BulkSelectOutcome {
                    run_id,
                    strategy,
                    target: request.target,
                    selected_before,
                    selected_after,
                    added: run.added,
                    pages_requested: run.pages_requested,
                    failed_pages: run.failed_pages,
                    preview: run.preview,
                };
                info!(
                    run = %run_id,
                    "Bulk selection finished with {} selected ({} added, {} failed pages)",
                    selected_after,
                    outcome.added,
                    outcome.failed_pages.len()
                );
                Ok(outcome)
            }
            Err(e) => {
                error!(run = %run_id, "Bulk selection aborted with {} selected: {}", selected_after, e);
                self.abort_progress();
                Err(e)
            }
        }
    }

    /// Reject requests that cannot be met. Records are only collected from
    /// the current page onward, so capacity counts those.
    fn validate(request: &BulkSelectRequest, current: usize, page_size: usize) -> Result<(), SelectError> {
        if request.target == 0 {
            return Err(ValidationError::NotPositive.into());
        }
        if request.target <= current {
            return Err(ValidationError::AlreadySatisfied {
                target: request.target,
                current,
            }
            .into());
        }
        if request.total_records == 0 || request.target > request.total_records {
            return Err(SelectError::Capacity {
                requested: request.target,
                available: request.total_records,
            });
        }

        let skipped = request.current_page.saturating_sub(1).saturating_mul(page_size);
        let reachable = request.total_records.saturating_sub(skipped);
        if request.target - current > reachable {
            return Err(SelectError::Capacity {
                requested: request.target,
                available: current + reachable,
            });
        }
        Ok(())
    }

    /// Add `ids` in order until the run needs no more, returns how many were added
    pub(crate) fn merge<I>(&self, selection: &RwLock<SelectionSet>, ids: I, run: &mut RunState) -> usize
    where
        I: IntoIterator<Item = RecordId>,
    {
        if run.remaining == 0 {
            return 0;
        }

        let mut added = 0;
        let size = {
            let mut set = selection.write();
            for id in ids {
                if run.remaining == 0 {
                    break;
                }
                if set.add(id) {
                    run.remaining -= 1;
                    added += 1;
                }
            }
            set.size()
        };
        run.added += added;

        if added > 0 {
            self.events.publish(SelectionChanged { size });
        }
        added
    }

    /// Report a checkpoint; lower values than the last one are dropped
    pub(crate) fn report(&self, percent: u8) {
        let reported = self.progress.lock().advance(percent);
        if let Some(percent) = reported {
            self.events.publish(ProgressChanged { percent, active: true });
        }
    }

    fn start_progress(&self) {
        self.progress.lock().start();
        self.events.publish(ProgressChanged { percent: 0, active: true });
    }

    fn finish_progress(&self) {
        self.progress.lock().finish();
        self.events.publish(ProgressChanged { percent: 100, active: false });
    }

    fn abort_progress(&self) {
        {
            let mut progress = self.progress.lock();
            progress.finish();
            progress.clear();
        }
        self.events.publish(ProgressChanged { percent: 0, active: false });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target(" 30 "), Ok(30));
        assert_eq!(parse_target("0"), Err(ValidationError::NotPositive));
        assert_eq!(parse_target("-4"), Err(ValidationError::NotPositive));
        assert_eq!(parse_target("ten"), Err(ValidationError::NotANumber("ten".to_string())));
        assert_eq!(parse_target("2.5"), Err(ValidationError::NotANumber("2.5".to_string())));
    }

    #[test]
    fn test_validate_order() {
        let request = BulkSelectRequest {
            target: 20,
            current_page: 1,
            total_records: 10,
        };
        // Already satisfied wins over capacity
        assert!(matches!(
            SelectionDispatcher::validate(&request, 25, 12),
            Err(SelectError::Validation(ValidationError::AlreadySatisfied { .. }))
        ));
        assert_eq!(
            SelectionDispatcher::validate(&request, 0, 12),
            Err(SelectError::Capacity { requested: 20, available: 10 })
        );

        let unknown_total = BulkSelectRequest { total_records: 0, ..request };
        assert!(matches!(
            SelectionDispatcher::validate(&unknown_total, 0, 12),
            Err(SelectError::Capacity { .. })
        ));
    }

    #[test]
    fn test_capacity_counts_from_current_page() {
        let request = BulkSelectRequest {
            target: 30,
            current_page: 10,
            total_records: 120,
        };
        assert_eq!(
            SelectionDispatcher::validate(&request, 0, 12),
            Err(SelectError::Capacity { requested: 30, available: 12 })
        );
        // Members from earlier pages count toward the target
        assert_eq!(SelectionDispatcher::validate(&request, 20, 12), Ok(()));

        // Partial last page: 125 records, pages 10 and 11 hold 17
        let partial = BulkSelectRequest { total_records: 125, target: 17, ..request };
        assert_eq!(SelectionDispatcher::validate(&partial, 0, 12), Ok(()));
        let over = BulkSelectRequest { target: 18, ..partial };
        assert_eq!(
            SelectionDispatcher::validate(&over, 0, 12),
            Err(SelectError::Capacity { requested: 18, available: 17 })
        );
    }

    #[test]
    fn test_busy_guard_releases() {
        let flag = AtomicBool::new(false);
        {
            let _guard = BusyGuard::acquire(&flag).unwrap();
            assert!(BusyGuard::acquire(&flag).is_none());
        }
        assert!(BusyGuard::acquire(&flag).is_some());
    }
}
