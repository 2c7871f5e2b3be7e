//! Deterministic in-memory catalog

use std::time::Duration;
use ahash::{AHashMap, AHashSet};
use async_trait::async_trait;
use at_core::{CatalogSource, FetchError, FieldSet, ListPage, Record, RecordId};
use parking_lot::RwLock;

/// Requests seen by a [`MemoryCatalog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRequest {
    List { page: usize, page_size: usize, fields: FieldSet },
    ByIds { ids: Vec<RecordId>, fields: FieldSet },
}

#[derive(Default)]
struct Faults {
    failing_pages: AHashSet<usize>,
    fail_by_ids: bool,
    page_delays: AHashMap<usize, Duration>,
}

/// Synthetic catalog of `total` records with ids `1..=total`.
///
/// Every request is recorded in issue order. Individual pages can be made to
/// fail or to respond late, which lets callers observe how partial failures
/// and out-of-order completion are handled.
pub struct MemoryCatalog {
    total: usize,
    requests: RwLock<Vec<CatalogRequest>>,
    faults: RwLock<Faults>,
}

impl MemoryCatalog {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            requests: RwLock::new(Vec::new()),
            faults: RwLock::new(Faults::default()),
        }
    }

    /// Build the record stored under `id`
    pub fn record(id: RecordId) -> Record {
        Record {
            id,
            title: Some(format!("Artwork {}", id)),
            place_of_origin: Some(["Paris", "Chicago", "Kyoto", "Florence"][id as usize % 4].to_string()),
            artist_display: Some(format!("Artist {}", id % 37)),
            inscriptions: (id % 5 == 0).then(|| format!("Signed lower right, no. {}", id)),
            date_start: Some(1800 + (id % 200) as i64),
            date_end: Some(1805 + (id % 200) as i64),
        }
    }

    /// Make list requests for `page` fail until restored
    pub fn fail_page(&self, page: usize) {
        self.faults.write().failing_pages.insert(page);
    }

    pub fn restore_page(&self, page: usize) {
        self.faults.write().failing_pages.remove(&page);
    }

    /// Make every by-ids request fail or succeed
    pub fn fail_by_ids(&self, fail: bool) {
        self.faults.write().fail_by_ids = fail;
    }

    /// Delay the response to list requests for `page`
    pub fn delay_page(&self, page: usize, delay: Duration) {
        self.faults.write().page_delays.insert(page, delay);
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Every request in issue order
    pub fn requests(&self) -> Vec<CatalogRequest> {
        self.requests.read().clone()
    }

    /// Page numbers of every list request in issue order
    pub fn list_calls(&self) -> Vec<usize> {
        self.requests
            .read()
            .iter()
            .filter_map(|request| match request {
                CatalogRequest::List { page, .. } => Some(*page),
                CatalogRequest::ByIds { .. } => None,
            })
            .collect()
    }

    /// Number of by-ids requests
    pub fn id_calls(&self) -> usize {
        self.requests
            .read()
            .iter()
            .filter(|request| matches!(request, CatalogRequest::ByIds { .. }))
            .count()
    }

    fn project(record: Record, fields: FieldSet) -> Record {
        match fields {
            FieldSet::IdOnly => Record::id_only(record.id),
            FieldSet::Full => record,
        }
    }
}

#[async_trait]
impl CatalogSource for MemoryCatalog {
    async fn list_page(
        &self,
        page: usize,
        page_size: usize,
        fields: FieldSet,
    ) -> Result<ListPage, FetchError> {
        self.requests.write().push(CatalogRequest::List { page, page_size, fields });

        let (failing, delay) = {
            let faults = self.faults.read();
            (faults.failing_pages.contains(&page), faults.page_delays.get(&page).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(FetchError::Status {
                endpoint: format!("/artworks?page={}", page),
                status: 503,
            });
        }

        let start = page.saturating_sub(1) * page_size;
        let end = (start + page_size).min(self.total);
        let records = (start..end)
            .map(|offset| Self::project(Self::record(offset as RecordId + 1), fields))
            .collect();

        Ok(ListPage {
            records,
            total_count: self.total,
        })
    }

    async fn fetch_by_ids(
        &self,
        ids: &[RecordId],
        fields: FieldSet,
    ) -> Result<Vec<Record>, FetchError> {
        self.requests.write().push(CatalogRequest::ByIds {
            ids: ids.to_vec(),
            fields,
        });

        if self.faults.read().fail_by_ids {
            return Err(FetchError::Transport("connection reset".to_string()));
        }

        Ok(ids
            .iter()
            .copied()
            .filter(|&id| id >= 1 && id as usize <= self.total)
            .map(|id| Self::project(Self::record(id), fields))
            .collect())
    }

    fn source_name(&self) -> &str {
        "memory"
    }
}
