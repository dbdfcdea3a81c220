//! Repository for the `versions` table.

use sqlx::PgPool;

use crate::models::version::Version;

/// Reads and records the durable schema version.
pub struct VersionRepo;

impl VersionRepo {
    /// The highest recorded version, or `None` if the table is empty.
    pub async fn latest(pool: &PgPool) -> Result<Option<Version>, sqlx::Error> {
        sqlx::query_as::<_, Version>(
            "SELECT id, version, created_at FROM versions ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(pool)
        .await
    }

    /// Record a new version, returning the inserted row.
    pub async fn insert(pool: &PgPool, version: i64) -> Result<Version, sqlx::Error> {
        sqlx::query_as::<_, Version>(
            "INSERT INTO versions (version) VALUES ($1) RETURNING id, version, created_at",
        )
        .bind(version)
        .fetch_one(pool)
        .await
    }
}
