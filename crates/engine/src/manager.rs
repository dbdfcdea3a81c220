//! Engine orchestrator.
//!
//! [`BenchManager`] owns the bench and user registries. It reconciles the
//! ephemeral cache with the durable store on startup, routes ownership
//! commands to bench actors, and reflects CRUD writes into the registries
//! and the cache.

use std::sync::Arc;

use bench_core::cache::{BenchCache, CacheStore};
use bench_core::protocol::{CommandResponse, CrudAction, CrudCommand, Entity, OwnershipAction, OwnershipCommand};
use bench_core::types::DbId;
use bench_db::models::bench::{CreateBench, UpdateBench};
use bench_db::models::user::{CreateUser, UpdateUser};
use bench_events::{BusEvent, EventBus};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use validator::Validate;

use crate::actor::BenchContext;
use crate::config::EngineConfig;
use crate::durable::DurableStore;
use crate::error::EngineError;
use crate::model::bench::BenchSnapshot;
use crate::model::user::UserSnapshot;
use crate::registry::{BenchRegistry, UserRegistry};

/// Full public state, as sent to a client on (re)connect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub resources: Vec<serde_json::Value>,
    pub requesters: Vec<serde_json::Value>,
    pub version: Option<i64>,
}

/// Typed variant of [`StateSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawState {
    pub benches: Vec<BenchSnapshot>,
    pub users: Vec<UserSnapshot>,
    pub version: Option<i64>,
}

#[derive(Default)]
struct Registries {
    benches: BenchRegistry,
    users: UserRegistry,
    version: Option<i64>,
}

pub struct BenchManager {
    ctx: BenchContext,
    durable: Arc<dyn DurableStore>,
    registries: RwLock<Registries>,
    /// Serializes CRUD so a durable write and its in-memory reflection never
    /// interleave with another CRUD command.
    crud_lock: Mutex<()>,
}

impl BenchManager {
    pub fn new(
        config: EngineConfig,
        durable: Arc<dyn DurableStore>,
        cache: Arc<dyn CacheStore>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            ctx: BenchContext { config, cache, bus },
            durable,
            registries: RwLock::new(Registries::default()),
            crud_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.ctx.bus
    }

    /// Load durable state, repair the cache if its version is stale, and
    /// start every bench. Safe to call again; running benches are flushed
    /// and stopped first.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        let _crud = self.crud_lock.lock().await;
        let mut registries = self.registries.write().await;
        self.load(&mut registries, false).await
    }

    /// Throw away all ephemeral state and start over from the durable
    /// records, regardless of the cache version.
    pub async fn reset_cache(&self) -> Result<(), EngineError> {
        let _crud = self.crud_lock.lock().await;
        let mut registries = self.registries.write().await;
        tracing::info!("Resetting bench cache");
        registries.benches.stop_all().await;
        self.ctx.cache.clear().await?;
        self.load(&mut registries, true).await
    }

    /// Stop every bench, flushing outstanding changes to the cache.
    pub async fn shutdown(&self) {
        let mut registries = self.registries.write().await;
        registries.benches.shutdown_all().await;
        registries.users = UserRegistry::new();
        tracing::info!("Bench manager shut down");
    }

    /// Route an ownership command to its bench.
    ///
    /// Unknown benches or users are logged and ignored. Returns the bench
    /// state after the command, or `None` if it was rejected.
    pub async fn handle_ownership_command(&self, cmd: &OwnershipCommand) -> Option<BenchSnapshot> {
        let registries = self.registries.read().await;

        let Some(bench) = registries.benches.get(cmd.resource_id) else {
            tracing::warn!(bench_id = cmd.resource_id, "Ownership command for unknown bench");
            return None;
        };
        if !registries.users.contains(cmd.requester_id) {
            tracing::warn!(
                bench_id = cmd.resource_id,
                user_id = cmd.requester_id,
                "Ownership command from unknown user"
            );
            return None;
        }

        let result = match cmd.command {
            OwnershipAction::RequestResource => bench.request(cmd.requester_id).await,
            OwnershipAction::FreeResource => bench.free(cmd.requester_id).await,
            OwnershipAction::ToggleMaintenance => bench.toggle_maintenance().await,
        };

        match result {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::error!(bench_id = cmd.resource_id, error = %e, "Ownership command failed");
                None
            }
        }
    }

    /// Write a CRUD command to the durable store, then reflect it into the
    /// registries and cache and announce it on the bus.
    pub async fn apply_crud_effect(&self, cmd: &CrudCommand) -> CommandResponse {
        let _crud = self.crud_lock.lock().await;

        match self.apply_crud(cmd).await {
            Ok(data) => {
                tracing::info!(
                    entity = cmd.entity.name(),
                    command = ?cmd.command,
                    id = ?data.get("id"),
                    "Entity changed"
                );
                self.ctx.bus.publish(BusEvent::entity_changed(
                    cmd.entity,
                    cmd.command.change_kind(),
                    data.clone(),
                ));
                CommandResponse::ok(Some(data))
            }
            Err(e) => {
                tracing::warn!(
                    entity = cmd.entity.name(),
                    command = ?cmd.command,
                    error = %e,
                    "CRUD command failed"
                );
                CommandResponse::failed(e.to_string())
            }
        }
    }

    /// Public snapshot of every bench and user.
    pub async fn get_state(&self) -> StateSnapshot {
        let registries = self.registries.read().await;
        StateSnapshot {
            resources: registries.benches.get_all_as_json(),
            requesters: registries.users.get_all_as_json(),
            version: registries.version,
        }
    }

    pub async fn get_raw_state(&self) -> RawState {
        let registries = self.registries.read().await;
        RawState {
            benches: registries.benches.get_all(),
            users: registries.users.get_all(),
            version: registries.version,
        }
    }

    // ---- private helpers ----

    fn initial_cache(&self) -> BenchCache {
        BenchCache::initial(self.ctx.config.pending_max_time_ms)
    }

    async fn load(&self, registries: &mut Registries, force_rebuild: bool) -> Result<(), EngineError> {
        // Flush running benches so a plain re-initialize resumes from the
        // latest state. A reset has already stopped them.
        registries.benches.shutdown_all().await;
        registries.users = UserRegistry::new();
        registries.version = None;

        let durable = self.durable.load().await?;
        let cache = &self.ctx.cache;

        let stale = force_rebuild
            || !cache.has_cache().await?
            || !cache.is_version_current(durable.version).await?;
        if stale {
            tracing::info!(
                version = durable.version,
                benches = durable.benches.len(),
                "Rebuilding bench cache"
            );
            let ids: Vec<DbId> = durable.benches.iter().map(|b| b.id).collect();
            cache
                .rebuild_all(&ids, durable.version, &self.initial_cache())
                .await?;
        }

        let mut records = cache.load().await?;
        for bench in durable.benches {
            let record = match records.remove(&bench.id) {
                Some(record) => record,
                None => {
                    tracing::warn!(bench_id = bench.id, "Bench has no cache record, starting it free");
                    let record = self.initial_cache();
                    cache.upsert(bench.id, &record).await?;
                    record
                }
            };
            registries.benches.create(bench, record, &self.ctx);
        }
        for orphan in records.into_keys() {
            tracing::warn!(bench_id = orphan, "Dropping cache record of unknown bench");
            cache.remove(orphan).await?;
        }

        for user in durable.users {
            registries.users.create(user);
        }
        registries.version = Some(durable.version);

        tracing::info!(
            version = durable.version,
            benches = registries.benches.len(),
            users = registries.users.len(),
            "Bench manager initialized"
        );
        Ok(())
    }

    /// Write the first cache record of a bench whose durable record already
    /// exists. A failure is logged, not returned: the durable write stands,
    /// and the next load writes the missing record.
    async fn seed_cache_record(&self, id: DbId, state: &BenchCache) {
        if let Err(e) = self.ctx.cache.upsert(id, state).await {
            tracing::error!(bench_id = id, error = %e, "Failed to write cache record for new bench");
        }
    }

    async fn apply_crud(&self, cmd: &CrudCommand) -> Result<serde_json::Value, EngineError> {
        match (cmd.entity, cmd.command) {
            (Entity::Bench, CrudAction::CreateEntity) => {
                let input: CreateBench = parse(&cmd.data)?;
                let record = self.durable.create_bench(&input).await?;
                let state = self.initial_cache();
                self.seed_cache_record(record.id, &state).await;

                let mut registries = self.registries.write().await;
                let bench = registries.benches.create(record, state, &self.ctx);
                to_json(bench.snapshot())
            }
            (Entity::Bench, CrudAction::UpdateEntity) => {
                let input: UpdateBench = parse(&cmd.data)?;
                let record = self.durable.update_bench(&input).await?;

                let mut registries = self.registries.write().await;
                let snapshot = match registries.benches.get(record.id) {
                    Some(bench) => bench.update_info(record).await?,
                    None => {
                        tracing::warn!(bench_id = record.id, "Updated bench was not running, starting it");
                        let state = self.initial_cache();
                        self.seed_cache_record(record.id, &state).await;
                        registries.benches.create(record, state, &self.ctx).snapshot()
                    }
                };
                to_json(snapshot)
            }
            (Entity::Bench, CrudAction::DeleteEntity) => {
                let id = target_id(cmd)?;
                let record = self.durable.delete_bench(id).await?;

                let mut registries = self.registries.write().await;
                let snapshot = match registries.benches.remove(id) {
                    Some(bench) => {
                        let snapshot = bench.snapshot();
                        bench.stop().await;
                        snapshot
                    }
                    None => BenchSnapshot {
                        info: record,
                        state: self.initial_cache(),
                    },
                };
                self.ctx.cache.remove(id).await?;
                to_json(snapshot)
            }
            (Entity::User, CrudAction::CreateEntity) => {
                let input: CreateUser = parse(&cmd.data)?;
                let user = self.durable.create_user(&input).await?;

                let mut registries = self.registries.write().await;
                to_json(registries.users.create(user).snapshot())
            }
            (Entity::User, CrudAction::UpdateEntity) => {
                let input: UpdateUser = parse(&cmd.data)?;
                let user = self.durable.update_user(&input).await?;

                let mut registries = self.registries.write().await;
                let id = user.id;
                if !registries.users.update(user.clone()) {
                    registries.users.create(user);
                }
                let snapshot = registries
                    .users
                    .get(id)
                    .map(|u| u.snapshot())
                    .ok_or(EngineError::NotFound { entity: "User", id })?;
                to_json(snapshot)
            }
            (Entity::User, CrudAction::DeleteEntity) => {
                let id = target_id(cmd)?;
                let user = self.durable.delete_user(id).await?;

                let mut registries = self.registries.write().await;
                let snapshot = match registries.users.remove(id) {
                    Some(model) => model.snapshot(),
                    None => crate::model::UserModel::new(user).snapshot(),
                };
                release_user(&registries.benches, id).await;
                to_json(snapshot)
            }
        }
    }
}

/// Free every bench `user_id` owns or waits for, as if they had freed it
/// themselves. Ownership passes on to the next in line.
async fn release_user(benches: &BenchRegistry, user_id: DbId) {
    let held = benches.iter().filter(|bench| {
        let state = bench.snapshot().state;
        state.owner == Some(user_id) || state.line.has(user_id)
    });
    let results = futures::future::join_all(held.map(|bench| bench.free(user_id))).await;
    for result in results {
        match result {
            Ok(snapshot) => tracing::info!(
                bench_id = snapshot.info.id,
                user_id,
                "Released bench held by deleted user"
            ),
            Err(e) => tracing::error!(user_id, error = %e, "Failed to release deleted user"),
        }
    }
}

/// Deserialize and validate a command payload.
fn parse<T: DeserializeOwned + Validate>(data: &serde_json::Value) -> Result<T, EngineError> {
    let input: T = serde_json::from_value(data.clone())
        .map_err(|e| EngineError::Validation(e.to_string()))?;
    input.validate()?;
    Ok(input)
}

fn target_id(cmd: &CrudCommand) -> Result<DbId, EngineError> {
    cmd.target_id()
        .ok_or_else(|| EngineError::Validation("data.id is required".to_string()))
}

fn to_json<T: Serialize>(value: T) -> Result<serde_json::Value, EngineError> {
    Ok(serde_json::to_value(value)?)
}
