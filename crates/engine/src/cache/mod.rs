//! [`CacheStore`](bench_core::cache::CacheStore) implementations.
//!
//! - [`MemoryCacheStore`]: process-local map, used in tests and for
//!   single-process deployments without a shared cache.
//! - [`PgCacheStore`]: UNLOGGED Postgres table, survives process restarts.

pub mod memory;
pub mod postgres;

use std::str::FromStr;

pub use memory::MemoryCacheStore;
pub use postgres::PgCacheStore;

/// Which cache implementation to run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Postgres,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(CacheBackend::Postgres),
            "memory" | "mem" => Ok(CacheBackend::Memory),
            other => Err(format!("unknown cache backend '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!("postgres".parse::<CacheBackend>(), Ok(CacheBackend::Postgres));
        assert_eq!(" Memory ".parse::<CacheBackend>(), Ok(CacheBackend::Memory));
        assert!("redis".parse::<CacheBackend>().is_err());
    }
}
