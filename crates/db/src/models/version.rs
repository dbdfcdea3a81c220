//! Schema version rows.

use bench_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `versions` table. The highest `version` is authoritative.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Version {
    pub id: DbId,
    pub version: i64,
    pub created_at: Timestamp,
}
