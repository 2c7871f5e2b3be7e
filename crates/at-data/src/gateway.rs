//! Remote catalog gateway with response caching

use std::sync::Arc;
use at_core::{CatalogSource, FetchError, FieldSet, ListPage, Record, RecordId};
use tracing::{debug, warn};

use crate::cache::{CacheStats, CachedPayload, PageCache, RequestSignature};

/// Thin wrapper over a catalog source that memoizes every successful
/// response in a [`PageCache`] keyed by its exact request signature.
pub struct CatalogGateway {
    source: Arc<dyn CatalogSource>,
    cache: PageCache,
}

impl CatalogGateway {
    pub fn new(source: Arc<dyn CatalogSource>, cache: PageCache) -> Self {
        Self { source, cache }
    }

    /// Fetch one page, served from cache when a fresh copy exists
    pub async fn list_page(
        &self,
        page: usize,
        page_size: usize,
        fields: FieldSet,
    ) -> Result<ListPage, FetchError> {
        let signature = RequestSignature::list(page, page_size, fields);
        if let Some(CachedPayload::Page(cached)) = self.cache.get(&signature) {
            debug!("Cache hit for {}", signature);
            return Ok(cached);
        }

        debug!("Cache miss for {}, fetching from {}", signature, self.source.source_name());
        let fetched = self.source.list_page(page, page_size, fields).await;
        match fetched {
            Ok(list) => {
                self.cache.put(signature, CachedPayload::Page(list.clone()));
                Ok(list)
            }
            Err(e) => {
                warn!("Fetching {} failed: {}", signature, e);
                Err(e)
            }
        }
    }

    /// Fetch full records for known identifiers.
    ///
    /// An empty id list resolves to no records without a network call.
    pub async fn fetch_by_ids(
        &self,
        ids: &[RecordId],
        fields: FieldSet,
    ) -> Result<Vec<Record>, FetchError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let signature = RequestSignature::by_ids(ids, fields);
        if let Some(CachedPayload::Records(cached)) = self.cache.get(&signature) {
            debug!("Cache hit for {} ids", ids.len());
            return Ok(cached);
        }

        let fetched = self.source.fetch_by_ids(ids, fields).await;
        match fetched {
            Ok(records) => {
                self.cache.put(signature, CachedPayload::Records(records.clone()));
                Ok(records)
            }
            Err(e) => {
                warn!("Fetching {} records by id failed: {}", ids.len(), e);
                Err(e)
            }
        }
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn source_name(&self) -> &str {
        self.source.source_name()
    }
}
