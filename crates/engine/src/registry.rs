//! Per-entity registries of live models.

use std::collections::HashMap;

use bench_core::cache::BenchCache;
use bench_core::types::DbId;
use bench_db::models::bench::BenchRecord;
use bench_db::models::user::User;

use crate::actor::{BenchContext, BenchHandle};
use crate::model::bench::BenchSnapshot;
use crate::model::user::{UserModel, UserSnapshot};

/// A model that can be indexed and snapshotted by a [`ModelRegistry`].
pub trait Model {
    type Snapshot;

    fn model_id(&self) -> DbId;

    fn public_snapshot(&self) -> Self::Snapshot;
}

impl Model for BenchHandle {
    type Snapshot = BenchSnapshot;

    fn model_id(&self) -> DbId {
        self.id()
    }

    fn public_snapshot(&self) -> BenchSnapshot {
        self.snapshot()
    }
}

impl Model for UserModel {
    type Snapshot = UserSnapshot;

    fn model_id(&self) -> DbId {
        self.id()
    }

    fn public_snapshot(&self) -> UserSnapshot {
        self.snapshot()
    }
}

/// Id-indexed collection of live models of one kind.
pub struct ModelRegistry<M> {
    models: HashMap<DbId, M>,
}

pub type BenchRegistry = ModelRegistry<BenchHandle>;
pub type UserRegistry = ModelRegistry<UserModel>;

impl<M: Model> ModelRegistry<M> {
    pub fn new() -> Self {
        Self {
            models: HashMap::new(),
        }
    }

    /// Register a model, returning the one it replaced.
    pub fn add(&mut self, model: M) -> Option<M> {
        self.models.insert(model.model_id(), model)
    }

    pub fn remove(&mut self, id: DbId) -> Option<M> {
        self.models.remove(&id)
    }

    pub fn get(&self, id: DbId) -> Option<&M> {
        self.models.get(&id)
    }

    pub fn contains(&self, id: DbId) -> bool {
        self.models.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Public snapshots of every model, ordered by id.
    pub fn get_all(&self) -> Vec<M::Snapshot> {
        let mut ids: Vec<DbId> = self.models.keys().copied().collect();
        ids.sort_unstable();
        ids.iter()
            .filter_map(|id| self.models.get(id))
            .map(Model::public_snapshot)
            .collect()
    }

    /// Like [`get_all`](Self::get_all), serialized to JSON values.
    pub fn get_all_as_json(&self) -> Vec<serde_json::Value>
    where
        M::Snapshot: serde::Serialize,
    {
        self.get_all()
            .into_iter()
            .filter_map(|snapshot| match serde_json::to_value(snapshot) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize model snapshot");
                    None
                }
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &M> {
        self.models.values()
    }

    /// Remove and return every model.
    pub fn drain(&mut self) -> Vec<M> {
        self.models.drain().map(|(_, model)| model).collect()
    }
}

impl<M: Model> Default for ModelRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry<BenchHandle> {
    /// Start a bench from its durable and cache records and register it.
    pub fn create(&mut self, info: BenchRecord, state: BenchCache, ctx: &BenchContext) -> &BenchHandle {
        let id = info.id;
        let handle = BenchHandle::spawn(info, state, ctx);
        if let Some(previous) = self.models.insert(id, handle) {
            tracing::warn!(bench_id = id, "Bench registered twice, stopping the older actor");
            tokio::spawn(previous.stop());
        }
        &self.models[&id]
    }

    /// Stop every bench, discarding unflushed changes.
    pub async fn stop_all(&mut self) {
        let handles = self.drain();
        tracing::debug!(count = handles.len(), "Stopping all benches");
        futures::future::join_all(handles.into_iter().map(BenchHandle::stop)).await;
    }

    /// Stop every bench after letting each batcher flush.
    pub async fn shutdown_all(&mut self) {
        let handles = self.drain();
        futures::future::join_all(handles.into_iter().map(BenchHandle::shutdown)).await;
    }
}

impl ModelRegistry<UserModel> {
    pub fn create(&mut self, user: User) -> &UserModel {
        let id = user.id;
        self.models.insert(id, UserModel::new(user));
        &self.models[&id]
    }

    /// Replace a user's record in place. Returns `false` if unknown.
    pub fn update(&mut self, user: User) -> bool {
        match self.models.get_mut(&user.id) {
            Some(model) => {
                model.update(user);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bench_core::cache::CacheStore;
    use bench_events::EventBus;

    use super::*;
    use crate::cache::MemoryCacheStore;
    use crate::config::EngineConfig;

    fn user(id: DbId, name: &str) -> User {
        User {
            id,
            name: name.to_string(),
            color: None,
        }
    }

    fn bench(id: DbId) -> BenchRecord {
        BenchRecord {
            id,
            name: format!("R{id}"),
            ip: None,
            stid: None,
            build: None,
            sw_ver: None,
            voice_control: None,
            gsim_cred_id: None,
            gsim_credentials: None,
        }
    }

    #[test]
    fn users_are_listed_by_id() {
        let mut users = UserRegistry::new();
        users.create(user(3, "Cid"));
        users.create(user(1, "Ann"));
        users.create(user(2, "Bob"));

        let names: Vec<String> = users.get_all().into_iter().map(|u| u.name).collect();
        assert_eq!(names, ["Ann", "Bob", "Cid"]);
    }

    #[test]
    fn update_and_remove_users() {
        let mut users = UserRegistry::new();
        users.create(user(1, "Ann"));

        assert!(users.update(user(1, "Anna")));
        assert!(!users.update(user(9, "Nobody")));
        assert_eq!(users.get(1).unwrap().user().name, "Anna");

        assert!(users.remove(1).is_some());
        assert!(users.is_empty());
    }

    #[test]
    fn json_snapshots_include_default_color() {
        let mut users = UserRegistry::new();
        users.create(user(1, "Ann"));
        assert_eq!(
            users.get_all_as_json(),
            vec![serde_json::json!({"id": 1, "name": "Ann", "color": "#FFF"})]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn benches_are_created_and_stopped() {
        let cache = Arc::new(MemoryCacheStore::new());
        cache
            .rebuild_all(&[1, 2], 1, &BenchCache::default())
            .await
            .unwrap();
        let ctx = BenchContext {
            config: EngineConfig::default(),
            cache,
            bus: Arc::new(EventBus::default()),
        };

        let mut benches = BenchRegistry::new();
        benches.create(bench(2), BenchCache::default(), &ctx);
        benches.create(bench(1), BenchCache::default(), &ctx);
        assert_eq!(benches.len(), 2);
        assert!(benches.contains(1));

        let json = benches.get_all_as_json();
        assert_eq!(json[0]["id"], 1);
        assert_eq!(json[1]["id"], 2);

        benches.stop_all().await;
        assert!(benches.is_empty());
    }
}
