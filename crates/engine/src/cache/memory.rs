use std::collections::HashMap;

use async_trait::async_trait;
use bench_core::cache::{BenchCache, BenchCacheUpdate, CacheError, CacheStore};
use bench_core::types::DbId;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryCache {
    version: Option<i64>,
    records: HashMap<DbId, BenchCache>,
}

/// In-process [`CacheStore`]. Contents are lost when the process exits, so
/// every start rebuilds.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    inner: RwLock<MemoryCache>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn has_cache(&self) -> Result<bool, CacheError> {
        Ok(!self.inner.read().await.records.is_empty())
    }

    async fn is_version_current(&self, durable_version: i64) -> Result<bool, CacheError> {
        Ok(self.inner.read().await.version == Some(durable_version))
    }

    async fn rebuild_all(
        &self,
        bench_ids: &[DbId],
        durable_version: i64,
        initial: &BenchCache,
    ) -> Result<(), CacheError> {
        let mut inner = self.inner.write().await;
        inner.version = Some(durable_version);
        inner.records = bench_ids.iter().map(|&id| (id, initial.clone())).collect();
        Ok(())
    }

    async fn load(&self) -> Result<HashMap<DbId, BenchCache>, CacheError> {
        Ok(self.inner.read().await.records.clone())
    }

    async fn get(&self, id: DbId) -> Result<Option<BenchCache>, CacheError> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn upsert(&self, id: DbId, record: &BenchCache) -> Result<(), CacheError> {
        self.inner.write().await.records.insert(id, record.clone());
        Ok(())
    }

    async fn merge_partial(&self, update: &BenchCacheUpdate) -> Result<BenchCache, CacheError> {
        let mut inner = self.inner.write().await;
        let record = inner
            .records
            .get_mut(&update.id)
            .ok_or(CacheError::Missing { id: update.id })?;
        record.apply(update);
        Ok(record.clone())
    }

    async fn remove(&self, id: DbId) -> Result<(), CacheError> {
        self.inner.write().await.records.remove(&id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut inner = self.inner.write().await;
        inner.version = None;
        inner.records.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn empty_store_has_no_cache_and_no_version() {
        let store = MemoryCacheStore::new();
        assert!(!store.has_cache().await.unwrap());
        assert!(!store.is_version_current(1).await.unwrap());
    }

    #[tokio::test]
    async fn rebuild_replaces_records_and_version() {
        let store = MemoryCacheStore::new();
        let mut stale = BenchCache::initial(10);
        stale.owner = Some(5);
        store.upsert(99, &stale).await.unwrap();

        store
            .rebuild_all(&[1, 2], 3, &BenchCache::initial(10))
            .await
            .unwrap();

        let records = store.load().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[&1], BenchCache::initial(10));
        assert!(store.is_version_current(3).await.unwrap());
        assert!(!store.is_version_current(2).await.unwrap());
    }

    #[tokio::test]
    async fn merge_partial_is_shallow() {
        let store = MemoryCacheStore::new();
        store
            .rebuild_all(&[1], 1, &BenchCache::initial(10))
            .await
            .unwrap();

        let merged = store
            .merge_partial(&BenchCacheUpdate::new(1).with_owner(Some(4)))
            .await
            .unwrap();

        assert_eq!(merged.owner, Some(4));
        assert_eq!(merged.pending_time_left, 10);
        assert_eq!(store.get(1).await.unwrap(), Some(merged));
    }

    #[tokio::test]
    async fn merge_partial_without_record_fails() {
        let store = MemoryCacheStore::new();
        let result = store
            .merge_partial(&BenchCacheUpdate::new(8).with_pending(true))
            .await;
        assert_matches!(result, Err(CacheError::Missing { id: 8 }));
        assert_eq!(store.get(8).await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_drops_version_and_records() {
        let store = MemoryCacheStore::new();
        store
            .rebuild_all(&[1], 1, &BenchCache::initial(10))
            .await
            .unwrap();
        store.remove(1).await.unwrap();
        assert!(!store.has_cache().await.unwrap());

        store.clear().await.unwrap();
        assert!(!store.is_version_current(1).await.unwrap());
    }
}
