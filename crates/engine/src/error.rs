use bench_core::cache::CacheError;
use bench_core::types::DbId;

/// Errors raised by the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The durable store has no version row. Startup cannot continue.
    #[error("Durable store has no version; apply the migrations first")]
    MissingVersion,

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The bench actor has already exited.
    #[error("Bench {0} is not running")]
    BenchStopped(DbId),
}

impl From<validator::ValidationErrors> for EngineError {
    fn from(errors: validator::ValidationErrors) -> Self {
        EngineError::Validation(errors.to_string())
    }
}
