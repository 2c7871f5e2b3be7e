//! Time-bounded response cache

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use ahash::AHashMap;
use at_core::{FieldSet, ListPage, Record, RecordId};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Default lifetime of a cache entry
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Source of the current time for staleness checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let Ok(by) = chrono::Duration::from_std(by) else {
            return;
        };
        let mut now = self.now.write();
        if let Some(later) = now.checked_add_signed(by) {
            *now = later;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// Exact endpoint and parameters of a catalog request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestSignature(String);

impl RequestSignature {
    /// Signature of a paginated list request
    pub fn list(page: usize, page_size: usize, fields: FieldSet) -> Self {
        Self(format!(
            "/artworks?page={}&limit={}&fields={}",
            page,
            page_size,
            fields.as_csv()
        ))
    }

    /// Signature of a bulk-by-ids request
    pub fn by_ids(ids: &[RecordId], fields: FieldSet) -> Self {
        let ids = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
        Self(format!("/artworks?ids={}&fields={}", ids, fields.as_csv()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cached response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedPayload {
    Page(ListPage),
    Records(Vec<Record>),
}

/// Hit and miss tallies of one cache instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Lookups that found an entry older than the TTL
    pub stale: u64,
}

struct CacheEntry {
    payload: CachedPayload,
    fetched_at: DateTime<Utc>,
}

/// Response cache keyed by request signature.
///
/// Entries older than the TTL are treated as absent and dropped on lookup.
/// There is no size bound: the key space is page number x page size x field
/// set, which is bounded by the catalog for a session.
pub struct PageCache {
    entries: RwLock<AHashMap<RequestSignature, CacheEntry>>,
    stats: RwLock<CacheStats>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl PageCache {
    /// Create a cache on the wall clock
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Create a cache on a custom clock
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(AHashMap::new()),
            stats: RwLock::new(CacheStats::default()),
            ttl,
            clock,
        }
    }

    /// Look up a fresh entry
    pub fn get(&self, signature: &RequestSignature) -> Option<CachedPayload> {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let mut stats = self.stats.write();

        match entries.get(signature) {
            Some(entry) if !self.is_expired(entry, now) => {
                stats.hits += 1;
                Some(entry.payload.clone())
            }
            Some(_) => {
                entries.remove(signature);
                stats.stale += 1;
                stats.misses += 1;
                None
            }
            None => {
                stats.misses += 1;
                None
            }
        }
    }

    /// Store a payload, replacing any previous entry
    pub fn put(&self, signature: RequestSignature, payload: CachedPayload) {
        let entry = CacheEntry {
            payload,
            fetched_at: self.clock.now(),
        };
        self.entries.write().insert(signature, entry);
    }

    /// Drop every expired entry, returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.read()
    }

    pub fn reset_stats(&self) {
        *self.stats.write() = CacheStats::default();
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(entry.fetched_at);
        // A clock running backwards counts as fresh
        age.to_std().map(|age| age > self.ttl).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(ids: &[RecordId]) -> CachedPayload {
        CachedPayload::Page(ListPage {
            records: ids.iter().copied().map(Record::id_only).collect(),
            total_count: 100,
        })
    }

    #[test]
    fn test_signature_format() {
        assert_eq!(
            RequestSignature::list(2, 12, FieldSet::IdOnly).as_str(),
            "/artworks?page=2&limit=12&fields=id"
        );
        assert_eq!(
            RequestSignature::by_ids(&[3, 1], FieldSet::IdOnly).as_str(),
            "/artworks?ids=3,1&fields=id"
        );
        assert_ne!(
            RequestSignature::list(2, 12, FieldSet::IdOnly),
            RequestSignature::list(2, 12, FieldSet::Full)
        );
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let clock = ManualClock::default();
        let cache = PageCache::with_clock(DEFAULT_TTL, Arc::new(clock.clone()));
        let key = RequestSignature::list(1, 12, FieldSet::Full);

        cache.put(key.clone(), page(&[1, 2]));
        clock.advance(Duration::from_secs(299));
        assert_eq!(cache.get(&key), Some(page(&[1, 2])));

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get(&key), None);
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.stale, 1);
    }

    #[test]
    fn test_put_overwrites_and_refreshes() {
        let clock = ManualClock::default();
        let cache = PageCache::with_clock(DEFAULT_TTL, Arc::new(clock.clone()));
        let key = RequestSignature::list(1, 12, FieldSet::Full);

        cache.put(key.clone(), page(&[1]));
        clock.advance(Duration::from_secs(200));
        cache.put(key.clone(), page(&[2]));
        clock.advance(Duration::from_secs(200));

        assert_eq!(cache.get(&key), Some(page(&[2])));
    }

    #[test]
    fn test_purge_expired() {
        let clock = ManualClock::default();
        let cache = PageCache::with_clock(Duration::from_secs(60), Arc::new(clock.clone()));

        cache.put(RequestSignature::list(1, 12, FieldSet::Full), page(&[1]));
        clock.advance(Duration::from_secs(90));
        cache.put(RequestSignature::list(2, 12, FieldSet::Full), page(&[2]));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);

        cache.reset_stats();
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
