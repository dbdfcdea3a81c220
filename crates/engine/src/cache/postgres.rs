use std::collections::HashMap;

use async_trait::async_trait;
use bench_core::cache::{BenchCache, BenchCacheUpdate, CacheError, CacheStore};
use bench_core::types::DbId;
use bench_db::repositories::BenchCacheRepo;
use bench_db::DbPool;

/// [`CacheStore`] backed by the UNLOGGED `bench_cache` table.
#[derive(Clone)]
pub struct PgCacheStore {
    pool: DbPool,
}

impl PgCacheStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn backend(e: sqlx::Error) -> CacheError {
    CacheError::Backend(e.to_string())
}

#[async_trait]
impl CacheStore for PgCacheStore {
    async fn has_cache(&self) -> Result<bool, CacheError> {
        let count = BenchCacheRepo::count(&self.pool).await.map_err(backend)?;
        Ok(count > 0)
    }

    async fn is_version_current(&self, durable_version: i64) -> Result<bool, CacheError> {
        let version = BenchCacheRepo::version(&self.pool).await.map_err(backend)?;
        Ok(version == Some(durable_version))
    }

    async fn rebuild_all(
        &self,
        bench_ids: &[DbId],
        durable_version: i64,
        initial: &BenchCache,
    ) -> Result<(), CacheError> {
        let record = serde_json::to_value(initial)?;
        BenchCacheRepo::replace_all(&self.pool, bench_ids, durable_version, &record)
            .await
            .map_err(backend)
    }

    async fn load(&self) -> Result<HashMap<DbId, BenchCache>, CacheError> {
        let rows = BenchCacheRepo::load_all(&self.pool).await.map_err(backend)?;
        let mut records = HashMap::with_capacity(rows.len());
        for (id, record) in rows {
            records.insert(id, serde_json::from_value(record)?);
        }
        Ok(records)
    }

    async fn get(&self, id: DbId) -> Result<Option<BenchCache>, CacheError> {
        match BenchCacheRepo::get(&self.pool, id).await.map_err(backend)? {
            Some(record) => Ok(Some(serde_json::from_value(record)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, id: DbId, record: &BenchCache) -> Result<(), CacheError> {
        let record = serde_json::to_value(record)?;
        BenchCacheRepo::upsert(&self.pool, id, &record)
            .await
            .map_err(backend)
    }

    async fn merge_partial(&self, update: &BenchCacheUpdate) -> Result<BenchCache, CacheError> {
        let mut delta = serde_json::to_value(update)?;
        // Records are keyed by the row, not by a field.
        if let Some(fields) = delta.as_object_mut() {
            fields.remove("id");
        }
        let merged = BenchCacheRepo::merge(&self.pool, update.id, &delta)
            .await
            .map_err(backend)?
            .ok_or(CacheError::Missing { id: update.id })?;
        Ok(serde_json::from_value(merged)?)
    }

    async fn remove(&self, id: DbId) -> Result<(), CacheError> {
        BenchCacheRepo::delete(&self.pool, id)
            .await
            .map(|_| ())
            .map_err(backend)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        BenchCacheRepo::clear(&self.pool).await.map_err(backend)
    }
}
