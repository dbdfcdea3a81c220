use async_trait::async_trait;
use bench_core::types::DbId;
use bench_db::models::bench::{BenchRecord, CreateBench, UpdateBench};
use bench_db::models::user::{CreateUser, UpdateUser, User};
use bench_db::repositories::{BenchRepo, UserRepo, VersionRepo};
use bench_db::DbPool;

use super::{DurableState, DurableStore};
use crate::error::EngineError;

/// [`DurableStore`] backed by the Postgres repositories.
#[derive(Clone)]
pub struct PgDurableStore {
    pool: DbPool,
}

impl PgDurableStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn bench_not_found(id: DbId) -> EngineError {
    EngineError::NotFound {
        entity: "Bench",
        id,
    }
}

fn user_not_found(id: DbId) -> EngineError {
    EngineError::NotFound { entity: "User", id }
}

#[async_trait]
impl DurableStore for PgDurableStore {
    async fn load(&self) -> Result<DurableState, EngineError> {
        let version = VersionRepo::latest(&self.pool)
            .await?
            .ok_or(EngineError::MissingVersion)?;
        let benches = BenchRepo::list(&self.pool).await?;
        let users = UserRepo::list(&self.pool).await?;
        Ok(DurableState {
            version: version.version,
            benches,
            users,
        })
    }

    async fn create_bench(&self, input: &CreateBench) -> Result<BenchRecord, EngineError> {
        Ok(BenchRepo::create(&self.pool, input).await?)
    }

    async fn update_bench(&self, input: &UpdateBench) -> Result<BenchRecord, EngineError> {
        BenchRepo::update(&self.pool, input)
            .await?
            .ok_or_else(|| bench_not_found(input.id))
    }

    async fn delete_bench(&self, id: DbId) -> Result<BenchRecord, EngineError> {
        BenchRepo::delete(&self.pool, id)
            .await?
            .ok_or_else(|| bench_not_found(id))
    }

    async fn create_user(&self, input: &CreateUser) -> Result<User, EngineError> {
        Ok(UserRepo::create(&self.pool, input).await?)
    }

    async fn update_user(&self, input: &UpdateUser) -> Result<User, EngineError> {
        UserRepo::update(&self.pool, input)
            .await?
            .ok_or_else(|| user_not_found(input.id))
    }

    async fn delete_user(&self, id: DbId) -> Result<User, EngineError> {
        UserRepo::delete(&self.pool, id)
            .await?
            .ok_or_else(|| user_not_found(id))
    }
}
