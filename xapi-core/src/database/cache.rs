use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    asset::{Asset, NewAsset},
    database::ports::{AssetRepository, BackendKind, Page},
    error::Result,
    filter::{AssetFilter, DeleteCriteria},
};

/// Identity of one list response: the page plus a digest of the filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListCacheKey {
    pub skip: u64,
    pub limit: u32,
    pub fingerprint: String,
}

impl ListCacheKey {
    pub fn new(filter: &AssetFilter, page: Page) -> Result<Self> {
        Ok(Self {
            skip: page.skip,
            limit: page.limit,
            fingerprint: filter.fingerprint()?,
        })
    }
}

#[derive(Debug, Clone)]
struct CachedPage {
    stored_at: Instant,
    rows: Arc<Vec<Asset>>,
}

#[derive(Debug, Default)]
struct CacheState {
    /// Bumped by every `clear`; a page read under an older generation may
    /// predate a write and is not stored.
    generation: u64,
    entries: HashMap<ListCacheKey, CachedPage>,
}

/// In-memory list results with a time-to-live and an entry cap.
///
/// When full, expired entries are dropped first, then the oldest one.
#[derive(Debug)]
pub struct ListCache {
    ttl: Duration,
    max_entries: usize,
    state: Mutex<CacheState>,
}

impl ListCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Store a page only if no `clear` happened since `generation` was read.
    /// Returns whether the page was stored.
    pub fn insert_if_current(
        &self,
        key: ListCacheKey,
        rows: Arc<Vec<Asset>>,
        generation: u64,
    ) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(
                read = generation,
                current = state.generation,
                "list page outdated by a write; not cached"
            );
            return false;
        }
        self.store(&mut state.entries, key, rows, Instant::now());
        true
    }

    pub fn get(&self, key: &ListCacheKey) -> Option<Arc<Vec<Asset>>> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(
        &self,
        key: &ListCacheKey,
        now: Instant,
    ) -> Option<Arc<Vec<Asset>>> {
        let mut state = self.state.lock();
        let entries = &mut state.entries;
        let cached = entries.get(key)?;
        if now.saturating_duration_since(cached.stored_at) >= self.ttl {
            entries.remove(key);
            return None;
        }
        Some(Arc::clone(&cached.rows))
    }

    #[cfg(test)]
    pub(crate) fn insert_at(
        &self,
        key: ListCacheKey,
        rows: Arc<Vec<Asset>>,
        now: Instant,
    ) {
        let mut state = self.state.lock();
        self.store(&mut state.entries, key, rows, now);
    }

    fn store(
        &self,
        entries: &mut HashMap<ListCacheKey, CachedPage>,
        key: ListCacheKey,
        rows: Arc<Vec<Asset>>,
        now: Instant,
    ) {
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let ttl = self.ttl;
            entries.retain(|_, cached| {
                now.saturating_duration_since(cached.stored_at) < ttl
            });

            if entries.len() >= self.max_entries
                && let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, cached)| cached.stored_at)
                    .map(|(key, _)| key.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CachedPage {
                stored_at: now,
                rows,
            },
        );
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.generation = state.generation.wrapping_add(1);
        if !state.entries.is_empty() {
            debug!(entries = state.entries.len(), "list cache cleared");
        }
        state.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Repository decorator that memoizes `list` and drops everything on writes.
pub struct CachedAssetRepository {
    inner: Arc<dyn AssetRepository>,
    cache: ListCache,
}

impl std::fmt::Debug for CachedAssetRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedAssetRepository")
            .field("backend", &self.inner.kind())
            .field("cache", &self.cache)
            .finish()
    }
}

impl CachedAssetRepository {
    pub fn new(inner: Arc<dyn AssetRepository>, cache: ListCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &ListCache {
        &self.cache
    }
}

#[async_trait]
impl AssetRepository for CachedAssetRepository {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    async fn create(&self, asset: NewAsset) -> Result<Asset> {
        let created = self.inner.create(asset).await?;
        self.cache.clear();
        Ok(created)
    }

    async fn list(&self, filter: &AssetFilter, page: Page) -> Result<Vec<Asset>> {
        let key = ListCacheKey::new(filter, page)?;
        if let Some(rows) = self.cache.get(&key) {
            debug!(skip = page.skip, limit = page.limit, "list cache hit");
            return Ok(rows.as_ref().clone());
        }

        let generation = self.cache.generation();
        let rows = self.inner.list(filter, page).await?;
        self.cache
            .insert_if_current(key, Arc::new(rows.clone()), generation);
        Ok(rows)
    }

    async fn count(&self, filter: &AssetFilter) -> Result<u64> {
        self.inner.count(filter).await
    }

    async fn get_by_identifier(&self, identifier: &str) -> Result<Option<Asset>> {
        self.inner.get_by_identifier(identifier).await
    }

    async fn delete_by_criteria(&self, criteria: &DeleteCriteria) -> Result<u64> {
        let deleted = self.inner.delete_by_criteria(criteria).await?;
        self.cache.clear();
        Ok(deleted)
    }

    async fn close(&self) {
        self.cache.clear();
        self.inner.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        asset::fixtures,
        database::ports::MockAssetRepository,
        error::StoreError,
    };
    use futures::channel::oneshot;
    use mockall::predicate::always;

    fn key(skip: u64) -> ListCacheKey {
        ListCacheKey::new(&AssetFilter::default(), Page::new(skip, 10)).unwrap()
    }

    fn rows(id: i64) -> Arc<Vec<Asset>> {
        Arc::new(vec![fixtures::asset(id, "t1")])
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = ListCache::new(Duration::from_secs(60), 10);
        let start = Instant::now();
        cache.insert_at(key(0), rows(1), start);

        assert!(cache.get_at(&key(0), start + Duration::from_secs(59)).is_some());
        assert!(cache.get_at(&key(0), start + Duration::from_secs(60)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn full_cache_evicts_oldest_entry() {
        let cache = ListCache::new(Duration::from_secs(600), 2);
        let start = Instant::now();
        cache.insert_at(key(0), rows(1), start);
        cache.insert_at(key(10), rows(2), start + Duration::from_secs(1));
        cache.insert_at(key(20), rows(3), start + Duration::from_secs(2));

        let now = start + Duration::from_secs(3);
        assert_eq!(cache.len(), 2);
        assert!(cache.get_at(&key(0), now).is_none());
        assert!(cache.get_at(&key(10), now).is_some());
        assert!(cache.get_at(&key(20), now).is_some());
    }

    #[test]
    fn full_cache_prefers_dropping_expired_entries() {
        let cache = ListCache::new(Duration::from_secs(10), 2);
        let start = Instant::now();
        cache.insert_at(key(0), rows(1), start);
        cache.insert_at(key(10), rows(2), start + Duration::from_secs(8));
        cache.insert_at(key(20), rows(3), start + Duration::from_secs(12));

        let now = start + Duration::from_secs(13);
        assert!(cache.get_at(&key(10), now).is_some());
        assert!(cache.get_at(&key(20), now).is_some());
    }

    #[test]
    fn pages_read_before_a_clear_are_dropped() {
        let cache = ListCache::new(Duration::from_secs(60), 10);
        let generation = cache.generation();
        cache.clear();

        assert!(!cache.insert_if_current(key(0), rows(1), generation));
        assert!(cache.is_empty());

        assert!(cache.insert_if_current(key(0), rows(1), cache.generation()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_differ_by_filter() {
        let page = Page::new(0, 10);
        let a = ListCacheKey::new(&AssetFilter::default(), page).unwrap();
        let b = ListCacheKey::new(
            &AssetFilter {
                title: Some("nginx".into()),
                ..AssetFilter::default()
            },
            page,
        )
        .unwrap();
        assert_ne!(a, b);
    }

    fn cached(mock: MockAssetRepository) -> CachedAssetRepository {
        CachedAssetRepository::new(
            Arc::new(mock),
            ListCache::new(Duration::from_secs(300), 100),
        )
    }

    #[tokio::test]
    async fn repeated_list_hits_backend_once() {
        let mut mock = MockAssetRepository::new();
        mock.expect_list()
            .with(always(), always())
            .times(1)
            .returning(|_, _| Ok(vec![fixtures::asset(1, "t1")]));

        let repo = cached(mock);
        let filter = AssetFilter::default();
        let first = repo.list(&filter, Page::default()).await.unwrap();
        let second = repo.list(&filter, Page::default()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.cache().len(), 1);
    }

    #[tokio::test]
    async fn writes_invalidate_cached_pages() {
        let mut mock = MockAssetRepository::new();
        mock.expect_list()
            .times(2)
            .returning(|_, _| Ok(Vec::new()));
        mock.expect_create()
            .times(1)
            .returning(|asset| Ok(Asset { id: 1, fields: asset }));
        mock.expect_delete_by_criteria()
            .times(1)
            .returning(|_| Ok(1));

        let repo = cached(mock);
        let filter = AssetFilter::default();

        repo.list(&filter, Page::default()).await.unwrap();
        repo.create(fixtures::new_asset("t1", "1.1.1.1", Some(80)))
            .await
            .unwrap();
        assert!(repo.cache().is_empty());

        repo.list(&filter, Page::default()).await.unwrap();
        assert_eq!(repo.cache().len(), 1);

        let criteria = DeleteCriteria {
            title: Some("Welcome".into()),
            ..DeleteCriteria::default()
        };
        repo.delete_by_criteria(&criteria).await.unwrap();
        assert!(repo.cache().is_empty());
    }

    /// Backend whose `list` waits until the test releases it, so a write can
    /// land while the read is in flight.
    struct GatedRepository {
        release: Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait]
    impl AssetRepository for GatedRepository {
        fn kind(&self) -> BackendKind {
            BackendKind::MySql
        }

        async fn create(&self, asset: NewAsset) -> Result<Asset> {
            Ok(Asset { id: 1, fields: asset })
        }

        async fn list(&self, _: &AssetFilter, _: Page) -> Result<Vec<Asset>> {
            let release = self.release.lock().take();
            if let Some(release) = release {
                let _ = release.await;
            }
            Ok(vec![fixtures::asset(1, "before-write")])
        }

        async fn count(&self, _: &AssetFilter) -> Result<u64> {
            Ok(0)
        }

        async fn get_by_identifier(&self, _: &str) -> Result<Option<Asset>> {
            Ok(None)
        }

        async fn delete_by_criteria(&self, _: &DeleteCriteria) -> Result<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn list_racing_a_write_is_not_cached() {
        let (release, gate) = oneshot::channel();
        let repo = CachedAssetRepository::new(
            Arc::new(GatedRepository {
                release: Mutex::new(Some(gate)),
            }),
            ListCache::new(Duration::from_secs(300), 100),
        );
        let filter = AssetFilter::default();

        let read = repo.list(&filter, Page::default());
        let write = async {
            repo.create(fixtures::new_asset("t1", "1.1.1.1", Some(80)))
                .await
                .unwrap();
            release.send(()).unwrap();
        };
        let (rows, ()) = futures::join!(read, write);

        assert_eq!(rows.unwrap().len(), 1);
        assert!(repo.cache().is_empty());

        // The next read runs after the write and is cached as usual.
        repo.list(&filter, Page::default()).await.unwrap();
        assert_eq!(repo.cache().len(), 1);
    }

    #[tokio::test]
    async fn failed_list_is_not_cached() {
        let mut mock = MockAssetRepository::new();
        let mut calls = 0;
        mock.expect_list().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(StoreError::StoreUnavailable("down".into()))
            } else {
                Ok(Vec::new())
            }
        });

        let repo = cached(mock);
        let filter = AssetFilter::default();
        assert!(repo.list(&filter, Page::default()).await.is_err());
        assert!(repo.list(&filter, Page::default()).await.is_ok());
    }

    #[tokio::test]
    async fn failed_create_keeps_cache() {
        let mut mock = MockAssetRepository::new();
        mock.expect_list().times(1).returning(|_, _| Ok(Vec::new()));
        mock.expect_create()
            .times(1)
            .returning(|_| Err(StoreError::DuplicateKey("ip, port".into())));

        let repo = cached(mock);
        repo.list(&AssetFilter::default(), Page::default())
            .await
            .unwrap();

        let err = repo
            .create(fixtures::new_asset("t2", "10.0.0.1", Some(80)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey(_)));
        assert_eq!(repo.cache().len(), 1);
    }
}
