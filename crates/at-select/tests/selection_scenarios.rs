use std::sync::Arc;
use std::time::Duration;

use at_core::events::events::ProgressChanged;
use at_core::{FieldSet, Notice, NoticeLevel, ViewMode};
use at_data::sources::CatalogRequest;
use at_data::{CatalogConfig, CatalogGateway, ManualClock, MemoryCatalog, PageCache};
use at_select::{CatalogSession, SelectError, Strategy, ValidationError};
use parking_lot::Mutex;

fn config(page_size: usize) -> CatalogConfig {
    CatalogConfig {
        page_size,
        ..CatalogConfig::default()
    }
}

fn session(total: usize) -> (Arc<MemoryCatalog>, CatalogSession) {
    let catalog = Arc::new(MemoryCatalog::new(total));
    let session = CatalogSession::new(config(12), catalog.clone());
    (catalog, session)
}

fn session_with_clock(total: usize) -> (Arc<MemoryCatalog>, ManualClock, CatalogSession) {
    let catalog = Arc::new(MemoryCatalog::new(total));
    let clock = ManualClock::default();
    let cache = PageCache::with_clock(Duration::from_secs(300), Arc::new(clock.clone()));
    let gateway = Arc::new(CatalogGateway::new(catalog.clone(), cache));
    (catalog, clock, CatalogSession::with_gateway(config(12), gateway))
}

#[derive(Clone, Default)]
struct EventLog {
    notices: Arc<Mutex<Vec<Notice>>>,
    progress: Arc<Mutex<Vec<ProgressChanged>>>,
}

impl EventLog {
    fn attach(session: &CatalogSession) -> Self {
        let log = Self::default();
        let notices = log.notices.clone();
        session
            .events()
            .subscribe_fn::<Notice, _>(move |notice| notices.lock().push(notice.clone()));
        let progress = log.progress.clone();
        session
            .events()
            .subscribe_fn::<ProgressChanged, _>(move |event| progress.lock().push(event.clone()));
        log
    }

    fn last_notice(&self) -> Notice {
        self.notices.lock().last().cloned().expect("a notice was published")
    }

    fn percents(&self) -> Vec<u8> {
        self.progress.lock().iter().map(|p| p.percent).collect()
    }
}

#[tokio::test]
async fn small_request_stops_after_page_three() {
    let (catalog, session) = session(120);
    session.on_page_requested(1).await.unwrap();

    let outcome = session.on_bulk_select_requested("30").await.unwrap();

    assert_eq!(outcome.strategy, Strategy::Sequential);
    assert_eq!(session.selection_size(), 30);
    assert_eq!(session.selected_ids(), (1..=30).collect::<Vec<_>>());
    assert_eq!(outcome.pages_requested, vec![1, 2, 3]);
    // Page 1 came from the cache filled by the browse, page 4 was never asked for
    assert_eq!(catalog.list_calls(), vec![1, 2, 3]);
}

#[tokio::test]
async fn request_beyond_catalog_is_a_capacity_warning() {
    let (_catalog, session) = session(10);
    let log = EventLog::attach(&session);
    session.on_page_requested(1).await.unwrap();

    let result = session.on_bulk_select_requested("50").await;

    assert_eq!(result, Err(SelectError::Capacity { requested: 50, available: 10 }));
    assert_eq!(session.selection_size(), 0);
    assert_eq!(log.last_notice().level, NoticeLevel::Warning);
    assert!(log.percents().is_empty());
}

#[tokio::test]
async fn unknown_total_is_rejected_before_any_fetch() {
    let (catalog, session) = session(120);

    let result = session.on_bulk_select_requested("5").await;

    assert!(matches!(result, Err(SelectError::Capacity { available: 0, .. })));
    assert!(catalog.requests().is_empty());
}

#[tokio::test]
async fn invalid_targets_are_validation_errors() {
    let (_catalog, session) = session(120);
    let log = EventLog::attach(&session);
    session.on_page_requested(1).await.unwrap();

    assert_eq!(
        session.on_bulk_select_requested("lots").await,
        Err(SelectError::Validation(ValidationError::NotANumber("lots".to_string())))
    );
    assert_eq!(log.last_notice().level, NoticeLevel::Warning);
    assert_eq!(
        session.on_bulk_select_requested("-3").await,
        Err(SelectError::Validation(ValidationError::NotPositive))
    );
    assert_eq!(session.selection_size(), 0);
}

#[tokio::test]
async fn repeating_the_same_target_is_a_no_op() {
    let (catalog, session) = session(120);
    let log = EventLog::attach(&session);
    session.on_page_requested(1).await.unwrap();

    session.on_bulk_select_requested("30").await.unwrap();
    let calls = catalog.requests().len();
    let second = session.on_bulk_select_requested("30").await;

    assert_eq!(
        second,
        Err(SelectError::Validation(ValidationError::AlreadySatisfied { target: 30, current: 30 }))
    );
    assert_eq!(log.last_notice().level, NoticeLevel::Info);
    assert_eq!(catalog.requests().len(), calls);
    assert_eq!(session.selection_size(), 30);
}

#[tokio::test]
async fn failed_page_during_hybrid_run_degrades_to_zero_records() {
    let (catalog, session) = session(120);
    let log = EventLog::attach(&session);
    session.on_page_requested(1).await.unwrap();
    catalog.fail_page(3);

    let outcome = session.on_bulk_select_requested("51").await.unwrap();

    assert_eq!(outcome.strategy, Strategy::Hybrid);
    assert_eq!(outcome.failed_pages, vec![3]);
    assert_eq!(outcome.pages_requested, vec![1, 2, 3, 4, 5]);
    assert_eq!(session.selection_size(), 48);
    assert!(session.is_selected(24) && session.is_selected(37));
    assert!(!(25..=36).any(|id| session.is_selected(id)));

    let notice = log.last_notice();
    assert_eq!(notice.level, NoticeLevel::Success);
    assert!(notice.message.contains("48 of 51"), "{}", notice.message);
    assert_eq!(log.percents(), vec![0, 10, 100]);
}

#[tokio::test]
async fn strategy_follows_additional_item_count() {
    let cases = [
        (50, Strategy::Sequential),
        (51, Strategy::Hybrid),
        (100, Strategy::Hybrid),
        (101, Strategy::ParallelBatched),
        (500, Strategy::ParallelBatched),
        (501, Strategy::BulkId),
    ];

    for (target, expected) in cases {
        let (_catalog, session) = session(2000);
        let log = EventLog::attach(&session);
        session.on_page_requested(1).await.unwrap();

        let outcome = session
            .on_bulk_select_requested(&target.to_string())
            .await
            .unwrap();

        assert_eq!(outcome.strategy, expected, "target {}", target);
        assert_eq!(session.selection_size(), target);
        match expected {
            Strategy::Hybrid => assert_eq!(log.percents(), vec![0, 10, 100]),
            Strategy::BulkId => assert_eq!(log.percents(), vec![0, 10, 20, 50, 80, 100]),
            _ => {
                let percents = log.percents();
                assert_eq!(&percents[..2], &[0, 10]);
                assert_eq!(percents.last(), Some(&100));
                assert!(percents.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}

#[tokio::test]
async fn threshold_counts_only_additional_items() {
    let (_catalog, session) = session(2000);
    session.on_page_requested(1).await.unwrap();
    session.on_selection_toggled(&(1..=12).collect::<Vec<_>>(), &[1, 2, 3, 4, 5]);

    let outcome = session.on_bulk_select_requested("55").await.unwrap();

    assert_eq!(outcome.strategy, Strategy::Sequential);
    assert_eq!(outcome.selected_before, 5);
    assert_eq!(outcome.added, 50);
    assert_eq!(session.selection_size(), 55);
}

#[tokio::test]
async fn selection_reaches_target_for_many_sizes() {
    for target in [1, 7, 12, 13, 48, 50, 51, 99, 100, 101, 250, 500, 501, 999, 1200] {
        let (_catalog, session) = session(1200);
        session.on_page_requested(1).await.unwrap();

        let outcome = session
            .on_bulk_select_requested(&target.to_string())
            .await
            .unwrap();

        assert_eq!(session.selection_size(), target, "target {}", target);
        assert_eq!(outcome.shortfall(), 0);
        assert!(!session.dispatcher().is_busy());
        assert_eq!(session.dispatcher().progress().percent(), 100);
    }
}

#[tokio::test]
async fn batched_run_issues_no_batch_after_target() {
    let (catalog, session) = session(2000);
    session.on_page_requested(1).await.unwrap();

    let outcome = session.on_bulk_select_requested("300").await.unwrap();

    assert_eq!(outcome.strategy, Strategy::ParallelBatched);
    // 12 local + 288 from pages 2..=25 in batches of 10, 10 and 4
    assert_eq!(outcome.pages_requested, (1..=25).collect::<Vec<_>>());
    assert_eq!(catalog.list_calls().iter().max(), Some(&25));
    assert_eq!(session.selection_size(), 300);
}

#[tokio::test]
async fn reconciliation_only_touches_the_visible_page() {
    let (_catalog, session) = session(120);

    let page1 = session.on_page_requested(1).await.unwrap();
    session.on_selection_toggled(&page1.ids(), &[1, 2, 3]);

    let page2 = session.on_page_requested(2).await.unwrap();
    session.on_selection_toggled(&page2.ids(), &[13, 14]);
    session.on_selection_toggled(&page2.ids(), &[]);

    assert_eq!(session.selected_ids(), vec![1, 2, 3]);
}

#[tokio::test]
async fn identical_page_within_ttl_hits_network_once() {
    let (catalog, clock, session) = session_with_clock(120);

    session.on_page_requested(2).await.unwrap();
    session.on_page_requested(2).await.unwrap();
    assert_eq!(catalog.list_calls(), vec![2]);

    clock.advance(Duration::from_secs(301));
    session.on_page_requested(2).await.unwrap();
    assert_eq!(catalog.list_calls(), vec![2, 2]);
    assert_eq!(session.cache_stats().hits, 1);
}

#[tokio::test]
async fn bulk_id_switches_to_review_with_preview() {
    let (catalog, session) = session(2000);
    session.on_page_requested(1).await.unwrap();

    let outcome = session.on_bulk_select_requested("600").await.unwrap();

    assert_eq!(outcome.strategy, Strategy::BulkId);
    assert_eq!(session.controller().mode(), ViewMode::ReviewingSelection);
    let preview: Vec<_> = outcome.preview.unwrap().iter().map(|r| r.id).collect();
    assert_eq!(preview, (1..=12).collect::<Vec<_>>());

    let id_only_pages: Vec<usize> = catalog
        .requests()
        .iter()
        .filter_map(|request| match request {
            CatalogRequest::List { page, fields: FieldSet::IdOnly, .. } => Some(*page),
            _ => None,
        })
        .collect();
    assert_eq!(id_only_pages, (1..=50).collect::<Vec<_>>());

    let review = session.on_page_requested(2).await.unwrap();
    assert_eq!(review.mode, ViewMode::ReviewingSelection);
    assert_eq!(review.ids(), (13..=24).collect::<Vec<_>>());
    assert_eq!(review.total_pages(), 50);
}

#[tokio::test]
async fn bulk_id_membership_follows_issue_order() {
    let (catalog, session) = session(2000);
    session.on_page_requested(1).await.unwrap();
    // Page 1 answers last, its ids still come first
    catalog.delay_page(1, Duration::from_millis(30));

    session.on_bulk_select_requested("501").await.unwrap();

    assert_eq!(session.selected_ids(), (1..=501).collect::<Vec<_>>());
}

#[tokio::test]
async fn failed_preview_keeps_membership() {
    let (catalog, session) = session(2000);
    session.on_page_requested(1).await.unwrap();
    catalog.fail_by_ids(true);

    let outcome = session.on_bulk_select_requested("700").await.unwrap();

    assert_eq!(outcome.preview, Some(Vec::new()));
    assert_eq!(session.selection_size(), 700);
}

#[tokio::test]
async fn bulk_id_aborts_when_every_page_fails() {
    let (catalog, session) = session(2000);
    let log = EventLog::attach(&session);
    session.on_page_requested(1).await.unwrap();
    for page in 1..=42 {
        catalog.fail_page(page);
    }

    let result = session.on_bulk_select_requested("501").await;

    assert!(matches!(result, Err(SelectError::Aborted(_))));
    assert_eq!(session.selection_size(), 0);
    assert_eq!(log.last_notice().level, NoticeLevel::Error);
    let last = log.progress.lock().last().cloned().unwrap();
    assert_eq!(last, ProgressChanged { percent: 0, active: false });
    assert_eq!(session.controller().mode(), ViewMode::Browsing);
}

#[tokio::test]
async fn failed_current_page_aborts_and_releases_busy_flag() {
    let (catalog, clock, session) = session_with_clock(120);
    let log = EventLog::attach(&session);
    session.on_page_requested(1).await.unwrap();
    clock.advance(Duration::from_secs(400));
    catalog.fail_page(1);

    let result = session.on_bulk_select_requested("20").await;

    assert!(matches!(result, Err(SelectError::Aborted(_))));
    assert_eq!(log.last_notice().level, NoticeLevel::Error);
    assert!(!session.dispatcher().is_busy());
    assert!(!session.dispatcher().progress().is_active());

    catalog.restore_page(1);
    session.on_bulk_select_requested("20").await.unwrap();
    assert_eq!(session.selection_size(), 20);
}

#[tokio::test]
async fn concurrent_bulk_select_is_rejected_as_busy() {
    let (catalog, session) = session(2000);
    session.on_page_requested(1).await.unwrap();
    catalog.delay_page(2, Duration::from_millis(30));

    let (first, second) = tokio::join!(
        session.on_bulk_select_requested("70"),
        session.on_bulk_select_requested("80"),
    );

    assert_eq!(first.unwrap().strategy, Strategy::Hybrid);
    assert_eq!(second, Err(SelectError::Busy));
    assert_eq!(session.selection_size(), 70);
    assert!(!session.dispatcher().is_busy());
}

#[tokio::test]
async fn clearing_returns_to_browsing() {
    let (_catalog, session) = session(2000);
    session.on_page_requested(1).await.unwrap();
    session.on_bulk_select_requested("600").await.unwrap();
    assert_eq!(session.controller().mode(), ViewMode::ReviewingSelection);

    session.on_clear_selection_requested();

    assert_eq!(session.selection_size(), 0);
    assert_eq!(session.controller().mode(), ViewMode::Browsing);
    let page = session.on_page_requested(3).await.unwrap();
    assert_eq!(page.mode, ViewMode::Browsing);
}

#[tokio::test]
async fn toggling_into_an_empty_selection_renders_an_empty_page() {
    let (catalog, session) = session(120);
    session.on_page_requested(1).await.unwrap();

    let view = session.on_view_mode_toggled().await.unwrap();

    assert_eq!(view.mode, ViewMode::ReviewingSelection);
    assert!(view.is_empty());
    assert_eq!(catalog.id_calls(), 0);
    assert_eq!(view.to_batch().unwrap().num_rows(), 0);
}

#[tokio::test]
async fn request_past_the_last_page_is_rejected_without_changes() {
    let (catalog, session) = session(120);
    let log = EventLog::attach(&session);
    session.on_page_requested(10).await.unwrap();
    let calls = catalog.requests().len();

    let result = session.on_bulk_select_requested("30").await;

    assert_eq!(result, Err(SelectError::Capacity { requested: 30, available: 12 }));
    assert_eq!(session.selection_size(), 0);
    assert_eq!(catalog.requests().len(), calls);
    assert_eq!(log.last_notice().level, NoticeLevel::Warning);
    assert!(log.percents().is_empty());
}

#[tokio::test]
async fn selection_starts_from_the_browsed_page() {
    let (catalog, session) = session(120);
    session.on_page_requested(4).await.unwrap();

    let outcome = session.on_bulk_select_requested("30").await.unwrap();

    assert_eq!(outcome.strategy, Strategy::Sequential);
    assert_eq!(outcome.pages_requested, vec![4, 5, 6]);
    assert_eq!(session.selected_ids(), (37..=66).collect::<Vec<_>>());
    assert_eq!(catalog.list_calls(), vec![4, 5, 6]);
}

#[tokio::test]
async fn batched_progress_follows_processed_pages() {
    let (_catalog, session) = session(2000);
    let log = EventLog::attach(&session);
    session.on_page_requested(1).await.unwrap();

    let outcome = session.on_bulk_select_requested("300").await.unwrap();

    assert_eq!(outcome.strategy, Strategy::ParallelBatched);
    // 24 pages in batches of 10, 10 and 4
    assert_eq!(log.percents(), vec![0, 10, 43, 77, 90, 100]);
}

#[tokio::test]
async fn rows_unchecked_during_a_run_do_not_break_the_report() {
    let (catalog, session) = session(120);
    let page1 = session.on_page_requested(1).await.unwrap();
    session.on_selection_toggled(&page1.ids(), &page1.ids());
    catalog.delay_page(2, Duration::from_millis(30));

    let (outcome, _) = tokio::join!(session.on_bulk_select_requested("14"), async {
        session.on_selection_toggled(&page1.ids(), &[])
    });

    let outcome = outcome.unwrap();
    assert_eq!(outcome.selected_before, 12);
    assert_eq!(outcome.selected_after, 2);
    assert_eq!(outcome.added, 2);
    assert_eq!(outcome.shortfall(), 12);
    assert_eq!(session.selected_ids(), vec![13, 14]);
    assert!(!session.dispatcher().is_busy());
}

#[tokio::test]
async fn next_and_previous_follow_the_current_mode() {
    let (_catalog, session) = session(30);
    session.on_page_requested(1).await.unwrap();

    let second = session.on_next_page_requested().await.unwrap();
    assert_eq!(second.ids(), (13..=24).collect::<Vec<_>>());
    let third = session.on_next_page_requested().await.unwrap();
    assert_eq!(third.ids(), (25..=30).collect::<Vec<_>>());
    assert!(session.on_next_page_requested().await.is_err());
    assert_eq!(session.controller().context().page, 3);

    let back = session.on_previous_page_requested().await.unwrap();
    assert_eq!(back.page, 2);

    session.on_selection_toggled(&second.ids(), &[14, 15]);
    let review = session.on_view_mode_toggled().await.unwrap();
    assert_eq!(review.ids(), vec![14, 15]);
    assert!(session.on_previous_page_requested().await.is_err());
    let past_end = session.on_next_page_requested().await.unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn review_page_past_the_selection_is_empty_not_an_error() {
    let (catalog, session) = session(120);
    let log = EventLog::attach(&session);
    let page1 = session.on_page_requested(1).await.unwrap();
    session.on_selection_toggled(&page1.ids(), &page1.ids());
    session.on_view_mode_toggled().await.unwrap();
    let id_calls = catalog.id_calls();

    let view = session.on_page_requested(3).await.unwrap();

    assert_eq!(view.mode, ViewMode::ReviewingSelection);
    assert_eq!(view.page, 3);
    assert!(view.is_empty());
    assert_eq!(view.total_pages(), 1);
    assert_eq!(catalog.id_calls(), id_calls);
    assert!(log.notices.lock().iter().all(|n| n.level != NoticeLevel::Error));
}
