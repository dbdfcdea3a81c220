//! Repository for the UNLOGGED `bench_cache` / `bench_cache_version` tables.
//!
//! Records are opaque JSONB objects here; the engine owns their shape.
//! Partial merges use the JSONB `||` operator, which is a shallow merge
//! where keys on the right win.

use bench_core::types::DbId;
use sqlx::PgPool;

/// Raw access to the ephemeral cache tables.
pub struct BenchCacheRepo;

impl BenchCacheRepo {
    /// Number of stored records.
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM bench_cache")
            .fetch_one(pool)
            .await
    }

    /// The stored cache version, if one was ever written.
    pub async fn version(pool: &PgPool) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT version FROM bench_cache_version WHERE singleton")
            .fetch_optional(pool)
            .await
    }

    /// Atomically replace every record with `record` for each id in
    /// `bench_ids` and store `version`.
    pub async fn replace_all(
        pool: &PgPool,
        bench_ids: &[DbId],
        version: i64,
        record: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM bench_cache")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO bench_cache (bench_id, record)
             SELECT id, $2 FROM UNNEST($1::BIGINT[]) AS t(id)",
        )
        .bind(bench_ids)
        .bind(record)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO bench_cache_version (singleton, version) VALUES (TRUE, $1)
             ON CONFLICT (singleton) DO UPDATE SET version = EXCLUDED.version",
        )
        .bind(version)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    /// All records as `(bench_id, record)` pairs.
    pub async fn load_all(pool: &PgPool) -> Result<Vec<(DbId, serde_json::Value)>, sqlx::Error> {
        sqlx::query_as("SELECT bench_id, record FROM bench_cache ORDER BY bench_id")
            .fetch_all(pool)
            .await
    }

    /// A single record.
    pub async fn get(pool: &PgPool, id: DbId) -> Result<Option<serde_json::Value>, sqlx::Error> {
        sqlx::query_scalar("SELECT record FROM bench_cache WHERE bench_id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or fully replace a record.
    pub async fn upsert(
        pool: &PgPool,
        id: DbId,
        record: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO bench_cache (bench_id, record) VALUES ($1, $2)
             ON CONFLICT (bench_id) DO UPDATE SET record = EXCLUDED.record, updated_at = NOW()",
        )
        .bind(id)
        .bind(record)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Shallow-merge `delta` onto an existing record.
    ///
    /// Returns the merged record, or `None` when there was nothing to merge
    /// into (no row is created).
    pub async fn merge(
        pool: &PgPool,
        id: DbId,
        delta: &serde_json::Value,
    ) -> Result<Option<serde_json::Value>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE bench_cache SET record = record || $2, updated_at = NOW()
             WHERE bench_id = $1
             RETURNING record",
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(pool)
        .await
    }

    /// Remove one record. Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM bench_cache WHERE bench_id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every record and the stored version.
    pub async fn clear(pool: &PgPool) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM bench_cache")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM bench_cache_version")
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }
}
