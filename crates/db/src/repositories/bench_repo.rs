//! Repository for the `benches` table and its `gsim_credentials`.

use bench_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::bench::{BenchRecord, BenchRow, CreateBench, CredentialInput, UpdateBench};

/// Joined select shared across queries to avoid repetition.
const SELECT_JOINED: &str = "SELECT b.id, b.name, b.ip, b.stid, b.build, b.sw_ver, b.voice_control, \
            b.gsim_cred_id, c.username AS cred_username, c.password AS cred_password \
     FROM benches b LEFT JOIN gsim_credentials c ON c.id = b.gsim_cred_id";

/// Provides CRUD operations for benches.
pub struct BenchRepo;

impl BenchRepo {
    /// Insert a new bench, returning the created row with credentials.
    ///
    /// Credentials are stored only when both username and password are set.
    pub async fn create(pool: &PgPool, input: &CreateBench) -> Result<BenchRecord, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let cred_id = match &input.gsim_credentials {
            Some(creds) if creds.is_complete() => Some(insert_credentials(&mut tx, creds).await?),
            _ => None,
        };

        let id: DbId = sqlx::query_scalar(
            "INSERT INTO benches (name, ip, stid, build, sw_ver, voice_control, gsim_cred_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(&input.name)
        .bind(&input.ip)
        .bind(&input.stid)
        .bind(&input.build)
        .bind(&input.sw_ver)
        .bind(input.voice_control)
        .bind(cred_id)
        .fetch_one(&mut *tx)
        .await?;

        let record = fetch_joined(&mut tx, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        tx.commit().await?;
        Ok(record)
    }

    /// Find a bench by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<BenchRecord>, sqlx::Error> {
        let query = format!("{SELECT_JOINED} WHERE b.id = $1");
        let row = sqlx::query_as::<_, BenchRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(BenchRecord::from))
    }

    /// List all benches ordered by id.
    pub async fn list(pool: &PgPool) -> Result<Vec<BenchRecord>, sqlx::Error> {
        let query = format!("{SELECT_JOINED} ORDER BY b.id");
        let rows = sqlx::query_as::<_, BenchRow>(&query)
            .fetch_all(pool)
            .await?;
        Ok(rows.into_iter().map(BenchRecord::from).collect())
    }

    /// Update a bench. Only non-`None` fields in `input` are applied.
    ///
    /// Credentials with an `id` are edited in place; complete credentials
    /// without one are created and linked. Returns `None` if no row with
    /// `input.id` exists.
    pub async fn update(
        pool: &PgPool,
        input: &UpdateBench,
    ) -> Result<Option<BenchRecord>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let cred_id = match &input.gsim_credentials {
            Some(creds) => match creds.id {
                Some(existing) => {
                    sqlx::query(
                        "UPDATE gsim_credentials SET username = $2, password = $3 WHERE id = $1",
                    )
                    .bind(existing)
                    .bind(&creds.username)
                    .bind(&creds.password)
                    .execute(&mut *tx)
                    .await?;
                    Some(existing)
                }
                None if creds.is_complete() => Some(insert_credentials(&mut tx, creds).await?),
                None => None,
            },
            None => None,
        };

        let updated = sqlx::query(
            "UPDATE benches SET
                name = COALESCE($2, name),
                ip = COALESCE($3, ip),
                stid = COALESCE($4, stid),
                build = COALESCE($5, build),
                sw_ver = COALESCE($6, sw_ver),
                voice_control = COALESCE($7, voice_control),
                gsim_cred_id = COALESCE($8, gsim_cred_id)
             WHERE id = $1",
        )
        .bind(input.id)
        .bind(&input.name)
        .bind(&input.ip)
        .bind(&input.stid)
        .bind(&input.build)
        .bind(&input.sw_ver)
        .bind(input.voice_control)
        .bind(cred_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let record = fetch_joined(&mut tx, input.id).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Delete a bench and its credentials. Returns the removed row, or
    /// `None` if it did not exist.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<BenchRecord>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let Some(record) = fetch_joined(&mut tx, id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM benches WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if let Some(cred_id) = record.gsim_cred_id {
            sqlx::query("DELETE FROM gsim_credentials WHERE id = $1")
                .bind(cred_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(Some(record))
    }
}

async fn insert_credentials(
    tx: &mut Transaction<'_, Postgres>,
    creds: &CredentialInput,
) -> Result<DbId, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO gsim_credentials (username, password) VALUES ($1, $2) RETURNING id",
    )
    .bind(&creds.username)
    .bind(&creds.password)
    .fetch_one(&mut **tx)
    .await
}

async fn fetch_joined(
    tx: &mut Transaction<'_, Postgres>,
    id: DbId,
) -> Result<Option<BenchRecord>, sqlx::Error> {
    let query = format!("{SELECT_JOINED} WHERE b.id = $1");
    let row = sqlx::query_as::<_, BenchRow>(&query)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row.map(BenchRecord::from))
}
