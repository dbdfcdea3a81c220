//! Per-bench actor task.
//!
//! [`BenchHandle::spawn`] starts two tasks for one bench:
//!
//! - the actor, which owns the [`BenchModel`] and both timers and processes
//!   commands and ticks from a single `tokio::select!` loop, so a command
//!   never interleaves with a tick;
//! - a [`ChangeBatcher`] fed by the actor's deltas.
//!
//! The latest [`BenchSnapshot`] is published on a `watch` channel so readers
//! never wait on the actor.

use std::sync::Arc;
use std::time::Duration;

use bench_core::cache::{BenchCache, BenchCacheUpdate, CacheStore};
use bench_core::types::{DbId, Millis};
use bench_db::models::bench::BenchRecord;
use bench_events::{ChangeBatcher, EventBus};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::model::bench::{BenchEffect, BenchModel, BenchSnapshot, TimerKind};

/// How long to wait for a bench's tasks to exit when stopping it.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared dependencies every bench actor is wired to.
#[derive(Clone)]
pub struct BenchContext {
    pub config: EngineConfig,
    pub cache: Arc<dyn CacheStore>,
    pub bus: Arc<EventBus>,
}

/// A command for one bench.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BenchOp {
    Request(DbId),
    Free(DbId),
    ToggleMaintenance,
    UpdateInfo(BenchRecord),
}

struct BenchMessage {
    op: BenchOp,
    reply: oneshot::Sender<BenchSnapshot>,
}

/// Owning handle to a running bench.
pub struct BenchHandle {
    id: DbId,
    commands: mpsc::UnboundedSender<BenchMessage>,
    snapshot: watch::Receiver<BenchSnapshot>,
    actor_cancel: CancellationToken,
    batcher_cancel: CancellationToken,
    actor_task: JoinHandle<()>,
    batcher_task: JoinHandle<()>,
}

impl BenchHandle {
    /// Start the actor and batcher for a bench.
    pub fn spawn(info: BenchRecord, state: BenchCache, ctx: &BenchContext) -> Self {
        let id = info.id;
        let model = BenchModel::new(info, state, ctx.config.pending_max_time_ms);

        let (snapshot_tx, snapshot_rx) = watch::channel(model.snapshot());
        let (delta_tx, delta_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let actor_cancel = CancellationToken::new();
        let batcher_cancel = CancellationToken::new();

        let batcher = ChangeBatcher::new(
            id,
            ctx.config.batch_window(),
            Arc::clone(&ctx.cache),
            Arc::clone(&ctx.bus),
        );
        let batcher_task = tokio::spawn(batcher.run(delta_rx, batcher_cancel.clone()));

        let actor = BenchActor {
            model,
            tick: ctx.config.tick(),
            tick_ms: ctx.config.tick_step_ms(),
            pending_timer: None,
            owned_timer: None,
            deltas: delta_tx,
            snapshot: snapshot_tx,
        };
        let cancel = actor_cancel.clone();
        let actor_task = tokio::spawn(async move {
            actor.run(command_rx, cancel).await;
            tracing::debug!(bench_id = id, "Bench actor exited");
        });

        Self {
            id,
            commands: command_tx,
            snapshot: snapshot_rx,
            actor_cancel,
            batcher_cancel,
            actor_task,
            batcher_task,
        }
    }

    pub fn id(&self) -> DbId {
        self.id
    }

    /// The latest published state.
    pub fn snapshot(&self) -> BenchSnapshot {
        self.snapshot.borrow().clone()
    }

    pub async fn request(&self, user_id: DbId) -> Result<BenchSnapshot, EngineError> {
        self.send(BenchOp::Request(user_id)).await
    }

    pub async fn free(&self, user_id: DbId) -> Result<BenchSnapshot, EngineError> {
        self.send(BenchOp::Free(user_id)).await
    }

    pub async fn toggle_maintenance(&self) -> Result<BenchSnapshot, EngineError> {
        self.send(BenchOp::ToggleMaintenance).await
    }

    pub async fn update_info(&self, info: BenchRecord) -> Result<BenchSnapshot, EngineError> {
        self.send(BenchOp::UpdateInfo(info)).await
    }

    /// Apply `op` and wait for the resulting state.
    pub async fn send(&self, op: BenchOp) -> Result<BenchSnapshot, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(BenchMessage { op, reply })
            .map_err(|_| EngineError::BenchStopped(self.id))?;
        response.await.map_err(|_| EngineError::BenchStopped(self.id))
    }

    /// Stop both tasks, dropping any changes still waiting in the batcher.
    pub async fn stop(self) {
        self.actor_cancel.cancel();
        self.batcher_cancel.cancel();
        join(self.id, "actor", self.actor_task).await;
        join(self.id, "batcher", self.batcher_task).await;
    }

    /// Stop the actor and let the batcher write out what it still holds.
    pub async fn shutdown(self) {
        self.actor_cancel.cancel();
        join(self.id, "actor", self.actor_task).await;
        // The actor owned the only delta sender; the batcher now drains and exits.
        join(self.id, "batcher", self.batcher_task).await;
    }
}

async fn join(bench_id: DbId, task: &'static str, handle: JoinHandle<()>) {
    match tokio::time::timeout(STOP_TIMEOUT, handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(bench_id, task, error = %e, "Bench task failed"),
        Err(_) => tracing::warn!(bench_id, task, "Bench task did not stop in time"),
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct BenchActor {
    model: BenchModel,
    tick: Duration,
    tick_ms: Millis,
    pending_timer: Option<Interval>,
    owned_timer: Option<Interval>,
    deltas: mpsc::UnboundedSender<BenchCacheUpdate>,
    snapshot: watch::Sender<BenchSnapshot>,
}

impl BenchActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<BenchMessage>,
        cancel: CancellationToken,
    ) {
        self.apply_effects();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                message = commands.recv() => {
                    let Some(BenchMessage { op, reply }) = message else {
                        break;
                    };
                    self.handle(op);
                    self.apply_effects();
                    let _ = reply.send(self.model.snapshot());
                }
                _ = next_tick(&mut self.pending_timer) => {
                    self.model.tick_pending(self.tick_ms);
                    self.apply_effects();
                }
                _ = next_tick(&mut self.owned_timer) => {
                    self.model.tick_owned(self.tick_ms);
                    self.apply_effects();
                }
            }
        }
    }

    fn handle(&mut self, op: BenchOp) {
        match op {
            BenchOp::Request(user_id) => self.model.request(user_id),
            BenchOp::Free(user_id) => self.model.free(user_id),
            BenchOp::ToggleMaintenance => self.model.toggle_maintenance(),
            BenchOp::UpdateInfo(info) => self.model.update_info(info),
        }
    }

    /// Carry out the model's queued effects and publish the new snapshot.
    fn apply_effects(&mut self) {
        for effect in self.model.take_effects() {
            match effect {
                BenchEffect::StartTimer(kind) => {
                    let timer = self.new_timer();
                    *self.timer_slot(kind) = Some(timer);
                }
                BenchEffect::StopTimer(kind) => *self.timer_slot(kind) = None,
                BenchEffect::Changed(delta) => {
                    if self.deltas.send(delta).is_err() {
                        tracing::warn!(bench_id = self.model.id(), "Change batcher is gone");
                    }
                }
            }
        }
        self.snapshot.send_replace(self.model.snapshot());
    }

    fn timer_slot(&mut self, kind: TimerKind) -> &mut Option<Interval> {
        match kind {
            TimerKind::Pending => &mut self.pending_timer,
            TimerKind::Owned => &mut self.owned_timer,
        }
    }

    /// A timer whose first tick fires one period from now.
    fn new_timer(&self) -> Interval {
        let mut timer = tokio::time::interval_at(Instant::now() + self.tick, self.tick);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer
    }
}

/// Resolve on the next tick of `timer`, or never if it is not running.
async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::cache::MemoryCacheStore;

    const MAX: Millis = 5_000;

    fn record(id: DbId) -> BenchRecord {
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

    async fn context() -> (BenchContext, Arc<MemoryCacheStore>) {
        let cache = Arc::new(MemoryCacheStore::new());
        cache
            .rebuild_all(&[42], 1, &BenchCache::initial(MAX))
            .await
            .unwrap();
        let ctx = BenchContext {
            config: EngineConfig {
                pending_max_time_ms: MAX,
                ..Default::default()
            },
            cache: cache.clone(),
            bus: Arc::new(EventBus::default()),
        };
        (ctx, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn owned_timer_counts_while_owned() {
        let (ctx, _cache) = context().await;
        let bench = BenchHandle::spawn(record(42), BenchCache::initial(MAX), &ctx);

        let snapshot = bench.request(1).await.unwrap();
        assert_eq!(snapshot.state.owner, Some(1));

        tokio::time::sleep(Duration::from_millis(3_100)).await;
        assert_eq!(bench.snapshot().state.owned_time, 3_000);

        bench.free(1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(bench.snapshot().state.owned_time, 0);

        bench.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn resumed_pending_bench_expires() {
        let (ctx, _cache) = context().await;
        let mut state = BenchCache::initial(MAX);
        state.owner = Some(1);
        state.pending = true;
        state.pending_time_left = 2_000;
        let bench = BenchHandle::spawn(record(42), state, &ctx);

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(bench.snapshot().state.pending_time_left, 1_000);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        let state = bench.snapshot().state;
        assert_eq!(state.owner, None);
        assert!(!state.pending);
        assert_eq!(state.pending_time_left, MAX);

        bench.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn zero_tick_still_expires_pending_hand_off() {
        let (mut ctx, _cache) = context().await;
        ctx.config.tick_ms = 0;
        let mut state = BenchCache::initial(MAX);
        state.owner = Some(1);
        state.pending = true;
        state.pending_time_left = 50;
        let bench = BenchHandle::spawn(record(42), state, &ctx);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let state = bench.snapshot().state;
        assert_eq!(state.owner, None);
        assert!(!state.pending);

        bench.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn changes_reach_cache_and_bus() {
        let (ctx, cache) = context().await;
        let mut events = ctx.bus.subscribe();
        let bench = BenchHandle::spawn(record(42), BenchCache::initial(MAX), &ctx);

        bench.request(1).await.unwrap();
        bench.request(2).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        let stored = cache.get(42).await.unwrap().unwrap();
        assert_eq!(stored.owner, Some(1));
        assert_eq!(stored.line.as_slice(), &[2]);
        assert_matches!(
            events.recv().await.unwrap(),
            bench_events::BusEvent::EntityCacheUpdate { resource_id: 42, .. }
        );

        bench.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_changes() {
        let (ctx, cache) = context().await;
        let bench = BenchHandle::spawn(record(42), BenchCache::initial(MAX), &ctx);

        bench.toggle_maintenance().await.unwrap();
        bench.shutdown().await;

        assert!(cache.get(42).await.unwrap().unwrap().maintenance);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_bench_rejects_commands() {
        let (ctx, _cache) = context().await;
        let bench = BenchHandle::spawn(record(42), BenchCache::initial(MAX), &ctx);
        let commands = bench.commands.clone();
        bench.stop().await;

        let (reply, _response) = oneshot::channel();
        assert!(commands
            .send(BenchMessage {
                op: BenchOp::ToggleMaintenance,
                reply,
            })
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn update_info_keeps_state() {
        let (ctx, _cache) = context().await;
        let bench = BenchHandle::spawn(record(42), BenchCache::initial(MAX), &ctx);
        bench.request(1).await.unwrap();

        let mut info = record(42);
        info.ip = Some("10.0.0.42".into());
        let snapshot = bench.update_info(info).await.unwrap();

        assert_eq!(snapshot.info.ip.as_deref(), Some("10.0.0.42"));
        assert_eq!(snapshot.state.owner, Some(1));
        assert_eq!(bench.snapshot(), snapshot);

        bench.stop().await;
    }
}
