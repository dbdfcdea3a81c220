//! Durable side of the engine: the authoritative version number and the
//! bench and user records, plus their CRUD.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use bench_core::types::DbId;
use bench_db::models::bench::{BenchRecord, CreateBench, UpdateBench};
use bench_db::models::user::{CreateUser, UpdateUser, User};

use crate::error::EngineError;

pub use memory::MemoryDurableStore;
pub use postgres::PgDurableStore;

/// Everything needed to build the registries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurableState {
    pub version: i64,
    pub benches: Vec<BenchRecord>,
    pub users: Vec<User>,
}

#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Load the current version and all records.
    ///
    /// Fails with [`EngineError::MissingVersion`] when no version exists.
    async fn load(&self) -> Result<DurableState, EngineError>;

    async fn create_bench(&self, input: &CreateBench) -> Result<BenchRecord, EngineError>;

    async fn update_bench(&self, input: &UpdateBench) -> Result<BenchRecord, EngineError>;

    async fn delete_bench(&self, id: DbId) -> Result<BenchRecord, EngineError>;

    async fn create_user(&self, input: &CreateUser) -> Result<User, EngineError>;

    async fn update_user(&self, input: &UpdateUser) -> Result<User, EngineError>;

    async fn delete_user(&self, id: DbId) -> Result<User, EngineError>;
}
