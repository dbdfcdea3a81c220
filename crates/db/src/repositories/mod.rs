//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod bench_cache_repo;
pub mod bench_repo;
pub mod user_repo;
pub mod version_repo;

pub use bench_cache_repo::BenchCacheRepo;
pub use bench_repo::BenchRepo;
pub use user_repo::UserRepo;
pub use version_repo::VersionRepo;
