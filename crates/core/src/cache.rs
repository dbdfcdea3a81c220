//! Ephemeral per-bench cache records, their deltas, and the store seam.
//!
//! A [`BenchCache`] holds the runtime-only state of one bench (owner,
//! pending hand-off, timers, line, maintenance). Mutations travel as
//! [`BenchCacheUpdate`] deltas that carry only the fields that changed.
//! Both shapes are camelCase on the wire and in storage.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

use crate::line::Line;
use crate::types::{DbId, Millis};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// How long a pending owner has to confirm a hand-off (15 minutes).
pub const DEFAULT_PENDING_MAX_TIME_MS: Millis = 15 * 60 * 1000;

/// Timer resolution for both the pending and the owned timer.
pub const DEFAULT_TICK_MS: Millis = 1000;

/// Length of one change-notification batching window.
pub const DEFAULT_BATCH_WINDOW_MS: Millis = 250;

// ---------------------------------------------------------------------------
// BenchCache
// ---------------------------------------------------------------------------

/// Full ephemeral record for one bench.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchCache {
    pub owner: Option<DbId>,
    pub pending: bool,
    pub pending_time_left: Millis,
    pub owned_time: Millis,
    pub maintenance: bool,
    pub line: Line,
}

impl BenchCache {
    /// The record every bench starts from after a cache rebuild.
    pub fn initial(pending_max_time: Millis) -> Self {
        Self {
            owner: None,
            pending: false,
            pending_time_left: pending_max_time,
            owned_time: 0,
            maintenance: false,
            line: Line::new(),
        }
    }

    /// Shallow-merge a delta onto this record. Fields absent from the delta
    /// are left untouched.
    pub fn apply(&mut self, update: &BenchCacheUpdate) {
        if let Some(owner) = update.owner {
            self.owner = owner;
        }
        if let Some(pending) = update.pending {
            self.pending = pending;
        }
        if let Some(left) = update.pending_time_left {
            self.pending_time_left = left;
        }
        if let Some(owned) = update.owned_time {
            self.owned_time = owned;
        }
        if let Some(maintenance) = update.maintenance {
            self.maintenance = maintenance;
        }
        if let Some(line) = &update.line {
            self.line = line.clone();
        }
    }
}

impl Default for BenchCache {
    fn default() -> Self {
        Self::initial(DEFAULT_PENDING_MAX_TIME_MS)
    }
}

// ---------------------------------------------------------------------------
// BenchCacheUpdate
// ---------------------------------------------------------------------------

/// A partial change to one bench's cache record.
///
/// `owner` is doubly optional: `None` means "unchanged", `Some(None)` means
/// "cleared" and serializes as `"owner": null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchCacheUpdate {
    pub id: DbId,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub owner: Option<Option<DbId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_time_left: Option<Millis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_time: Option<Millis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
}

/// Marks a field that was present in the input, even when its value is null.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl BenchCacheUpdate {
    /// An empty delta for `id`.
    pub fn new(id: DbId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn with_owner(mut self, owner: Option<DbId>) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_pending(mut self, pending: bool) -> Self {
        self.pending = Some(pending);
        self
    }

    pub fn with_pending_time_left(mut self, left: Millis) -> Self {
        self.pending_time_left = Some(left);
        self
    }

    pub fn with_owned_time(mut self, owned: Millis) -> Self {
        self.owned_time = Some(owned);
        self
    }

    pub fn with_maintenance(mut self, maintenance: bool) -> Self {
        self.maintenance = Some(maintenance);
        self
    }

    pub fn with_line(mut self, line: Line) -> Self {
        self.line = Some(line);
        self
    }

    /// Fold a later delta into this one; fields set in `later` win.
    pub fn merge(&mut self, later: BenchCacheUpdate) {
        if later.owner.is_some() {
            self.owner = later.owner;
        }
        if later.pending.is_some() {
            self.pending = later.pending;
        }
        if later.pending_time_left.is_some() {
            self.pending_time_left = later.pending_time_left;
        }
        if later.owned_time.is_some() {
            self.owned_time = later.owned_time;
        }
        if later.maintenance.is_some() {
            self.maintenance = later.maintenance;
        }
        if later.line.is_some() {
            self.line = later.line;
        }
    }

    /// True when no field besides the id is set.
    pub fn is_empty(&self) -> bool {
        self.owner.is_none()
            && self.pending.is_none()
            && self.pending_time_left.is_none()
            && self.owned_time.is_none()
            && self.maintenance.is_none()
            && self.line.is_none()
    }
}

// ---------------------------------------------------------------------------
// CacheStore
// ---------------------------------------------------------------------------

/// Errors raised by a [`CacheStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// A partial merge targeted a bench with no stored record. This means the
    /// in-memory model and the cache went out of sync.
    #[error("No cache record to update for bench {id}")]
    Missing { id: DbId },

    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Keyed, versioned store of [`BenchCache`] records.
///
/// One global version number covers every record; when it differs from the
/// durable version the whole cache is rebuilt.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Whether any cache records exist.
    async fn has_cache(&self) -> Result<bool, CacheError>;

    /// Compare the stored version with the durable one.
    async fn is_version_current(&self, durable_version: i64) -> Result<bool, CacheError>;

    /// Discard every record, write `durable_version`, and store `initial`
    /// for each of `bench_ids`.
    async fn rebuild_all(
        &self,
        bench_ids: &[DbId],
        durable_version: i64,
        initial: &BenchCache,
    ) -> Result<(), CacheError>;

    /// All stored records keyed by bench id.
    async fn load(&self) -> Result<HashMap<DbId, BenchCache>, CacheError>;

    async fn get(&self, id: DbId) -> Result<Option<BenchCache>, CacheError>;

    async fn upsert(&self, id: DbId, record: &BenchCache) -> Result<(), CacheError>;

    /// Shallow-merge `update` onto the stored record and write it back.
    ///
    /// Fails with [`CacheError::Missing`] instead of creating a record.
    async fn merge_partial(&self, update: &BenchCacheUpdate) -> Result<BenchCache, CacheError>;

    async fn remove(&self, id: DbId) -> Result<(), CacheError>;

    /// Drop every record and the stored version.
    async fn clear(&self) -> Result<(), CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_record_is_free() {
        let cache = BenchCache::initial(5000);
        assert_eq!(cache.owner, None);
        assert!(!cache.pending);
        assert_eq!(cache.pending_time_left, 5000);
        assert_eq!(cache.owned_time, 0);
        assert!(!cache.maintenance);
        assert!(cache.line.is_empty());
    }

    #[test]
    fn merge_later_fields_win() {
        let mut first = BenchCacheUpdate::new(1)
            .with_owner(Some(4))
            .with_owned_time(1000);
        first.merge(BenchCacheUpdate::new(1).with_owned_time(2000));
        first.merge(BenchCacheUpdate::new(1).with_maintenance(true));

        assert_eq!(first.owner, Some(Some(4)));
        assert_eq!(first.owned_time, Some(2000));
        assert_eq!(first.maintenance, Some(true));
        assert_eq!(first.pending, None);
    }

    #[test]
    fn merge_keeps_cleared_owner() {
        let mut first = BenchCacheUpdate::new(1).with_owner(Some(4));
        first.merge(BenchCacheUpdate::new(1).with_owner(None));
        assert_eq!(first.owner, Some(None));
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut cache = BenchCache::initial(9000);
        cache.apply(
            &BenchCacheUpdate::new(1)
                .with_owner(Some(2))
                .with_line(Line::from(vec![3])),
        );
        assert_eq!(cache.owner, Some(2));
        assert_eq!(cache.line.as_slice(), &[3]);
        assert_eq!(cache.pending_time_left, 9000);

        cache.apply(&BenchCacheUpdate::new(1).with_owner(None));
        assert_eq!(cache.owner, None);
    }

    #[test]
    fn update_serializes_only_changed_fields() {
        let update = BenchCacheUpdate::new(42).with_owner(None).with_pending(false);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 42, "owner": null, "pending": false})
        );
    }

    #[test]
    fn update_deserializes_null_owner_as_cleared() {
        let cleared: BenchCacheUpdate =
            serde_json::from_str(r#"{"id": 1, "owner": null}"#).unwrap();
        assert_eq!(cleared.owner, Some(None));

        let absent: BenchCacheUpdate = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(absent.owner, None);
        assert!(absent.is_empty());
    }

    #[test]
    fn record_uses_camel_case() {
        let json = serde_json::to_value(BenchCache::initial(10)).unwrap();
        assert_eq!(json["pendingTimeLeft"], 10);
        assert_eq!(json["ownedTime"], 0);
        assert_eq!(json["line"], serde_json::json!([]));
    }
}
