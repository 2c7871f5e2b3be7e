//! The four population strategies
//!
//! Concurrent fetches are joined on the calling task, never spawned, and their
//! results are always consumed in the order the requests were issued.

use at_core::model::pages_for;
use at_core::progress::batch_percent;
use at_core::{FetchError, FieldSet, ListPage, Record, SelectionSet};
use futures::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::controller::arrange_by_ids;
use crate::dispatcher::{BulkSelectRequest, SelectionDispatcher};
use crate::SelectError;

/// Bookkeeping of one run
#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub remaining: usize,
    pub added: usize,
    pub pages_requested: Vec<usize>,
    pub failed_pages: Vec<usize>,
    pub preview: Option<Vec<Record>>,
}

impl RunState {
    pub fn new(remaining: usize) -> Self {
        Self {
            remaining,
            ..Self::default()
        }
    }
}

/// Up to `count` consecutive pages from `first`, never past the last page
fn plan_pages(first: usize, count: usize, request: &BulkSelectRequest, page_size: usize) -> Vec<usize> {
    let last = pages_for(request.total_records, page_size);
    (first..first.saturating_add(count))
        .take_while(|&page| page <= last)
        .collect()
}

/// Select the unselected records of the current page. A failure here aborts
/// the run.
async fn consume_local_page(
    d: &SelectionDispatcher,
    request: &BulkSelectRequest,
    selection: &RwLock<SelectionSet>,
    run: &mut RunState,
) -> Result<(), SelectError> {
    run.pages_requested.push(request.current_page);
    let page = d
        .gateway
        .list_page(request.current_page, d.page_size, FieldSet::Full)
        .await?;

    let unselected = selection.read().unselected(&page.ids());
    let added = d.merge(selection, unselected, run);
    debug!("Current page {} contributed {} records", request.current_page, added);
    Ok(())
}

/// Issue every page at once and wait for all of them
async fn fetch_concurrently(
    d: &SelectionDispatcher,
    pages: &[usize],
    fields: FieldSet,
    run: &mut RunState,
) -> Vec<Result<ListPage, FetchError>> {
    run.pages_requested.extend_from_slice(pages);
    join_all(
        pages
            .iter()
            .map(|&page| d.gateway.list_page(page, d.page_size, fields)),
    )
    .await
}

/// Merge a fetched page; a failed page contributes nothing
fn apply_page(
    d: &SelectionDispatcher,
    selection: &RwLock<SelectionSet>,
    page: usize,
    result: Result<ListPage, FetchError>,
    run: &mut RunState,
) {
    match result {
        Ok(list) => {
            d.merge(selection, list.ids(), run);
        }
        Err(e) => {
            warn!("Page {} skipped: {}", page, e);
            run.failed_pages.push(page);
        }
    }
}

/// Current page, then following pages one at a time within the page budget.
///
/// The budget grows to the pages `remaining` needs when the configured budget
/// cannot cover it.
pub(crate) async fn sequential(
    d: &SelectionDispatcher,
    request: &BulkSelectRequest,
    selection: &RwLock<SelectionSet>,
    run: &mut RunState,
) -> Result<(), SelectError> {
    consume_local_page(d, request, selection, run).await?;
    d.report(10);

    let budget = d
        .sequential_page_budget
        .max(pages_for(run.remaining, d.page_size));
    let pages = plan_pages(request.current_page + 1, budget, request, d.page_size);

    for (index, &page) in pages.iter().enumerate() {
        if run.remaining == 0 {
            break;
        }
        run.pages_requested.push(page);
        let result = d.gateway.list_page(page, d.page_size, FieldSet::Full).await;
        apply_page(d, selection, page, result, run);
        d.report(batch_percent(index + 1, budget));
    }
    Ok(())
}

/// Current page, then every needed page concurrently
pub(crate) async fn hybrid(
    d: &SelectionDispatcher,
    request: &BulkSelectRequest,
    selection: &RwLock<SelectionSet>,
    run: &mut RunState,
) -> Result<(), SelectError> {
    consume_local_page(d, request, selection, run).await?;
    d.report(10);

    if run.remaining == 0 {
        return Ok(());
    }

    let pages = plan_pages(
        request.current_page + 1,
        pages_for(run.remaining, d.page_size),
        request,
        d.page_size,
    );
    debug!("Fetching pages {:?} concurrently", pages);

    let results = fetch_concurrently(d, &pages, FieldSet::Full, run).await;
    for (&page, result) in pages.iter().zip(results) {
        apply_page(d, selection, page, result, run);
    }
    Ok(())
}

/// Current page, then needed pages in concurrent batches. No further batch is
/// issued once the target is reached.
pub(crate) async fn batched(
    d: &SelectionDispatcher,
    request: &BulkSelectRequest,
    selection: &RwLock<SelectionSet>,
    run: &mut RunState,
) -> Result<(), SelectError> {
    consume_local_page(d, request, selection, run).await?;
    d.report(10);

    let pages = plan_pages(
        request.current_page + 1,
        pages_for(run.remaining, d.page_size),
        request,
        d.page_size,
    );
    let total = pages.len();
    let mut processed = 0;

    for batch in pages.chunks(d.batch_size) {
        if run.remaining == 0 {
            debug!("Target reached after {} of {} pages", processed, total);
            break;
        }

        let results = fetch_concurrently(d, batch, FieldSet::Full, run).await;
        for (&page, result) in batch.iter().zip(results) {
            apply_page(d, selection, page, result, run);
        }

        processed += batch.len();
        d.report(batch_percent(processed, total));
    }
    Ok(())
}

/// Collect ids only, merge them in page order, then fetch full records for
/// the first page of the selection.
pub(crate) async fn bulk_id(
    d: &SelectionDispatcher,
    request: &BulkSelectRequest,
    selection: &RwLock<SelectionSet>,
    run: &mut RunState,
) -> Result<(), SelectError> {
    d.report(10);

    let pages = plan_pages(
        request.current_page,
        pages_for(run.remaining, d.page_size),
        request,
        d.page_size,
    );
    d.report(20);

    let results = fetch_concurrently(d, &pages, FieldSet::IdOnly, run).await;
    let mut candidates = Vec::with_capacity(pages.len() * d.page_size);
    let mut collected_pages = 0;
    let mut last_error = None;

    for (&page, result) in pages.iter().zip(results) {
        match result {
            Ok(list) => {
                collected_pages += 1;
                candidates.extend(list.ids());
            }
            Err(e) => {
                warn!("Page {} skipped during id collection: {}", page, e);
                run.failed_pages.push(page);
                last_error = Some(e);
            }
        }
    }

    if collected_pages == 0 {
        if let Some(e) = last_error {
            return Err(SelectError::Aborted(e));
        }
    }
    debug!("Collected {} candidate ids from {} pages", candidates.len(), collected_pages);
    d.report(50);

    d.merge(selection, candidates, run);
    d.report(80);

    let preview_ids = selection.read().slice(0, d.page_size);
    let preview = match d.gateway.fetch_by_ids(&preview_ids, FieldSet::Full).await {
        Ok(records) => arrange_by_ids(&preview_ids, records),
        Err(e) => {
            warn!("Preview of the selection failed: {}", e);
            Vec::new()
        }
    };
    run.preview = Some(preview);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(total_records: usize) -> BulkSelectRequest {
        BulkSelectRequest {
            target: 1,
            current_page: 1,
            total_records,
        }
    }

    #[test]
    fn test_plan_stops_at_last_page() {
        assert_eq!(plan_pages(2, 3, &request(120), 12), vec![2, 3, 4]);
        assert_eq!(plan_pages(9, 5, &request(120), 12), vec![9, 10]);
        assert!(plan_pages(11, 2, &request(120), 12).is_empty());
        assert_eq!(plan_pages(1, 2, &request(13), 12), vec![1, 2]);
    }
}
