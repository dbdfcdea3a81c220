//! Single-bench ownership state machine.
//!
//! A bench is in one of three states:
//!
//! - **Free**: no owner.
//! - **Pending**: an owner was picked from the line and must confirm within
//!   `pending_max_time_ms`; the pending timer counts down.
//! - **Owned**: the owner confirmed (or took a free bench directly); the owned
//!   timer counts up.
//!
//! [`BenchModel`] is synchronous and owns no timers. Each operation records
//! what should happen next as [`BenchEffect`]s (start/stop a timer, publish a
//! delta) which the bench actor drains and carries out.

use bench_core::cache::{BenchCache, BenchCacheUpdate};
use bench_core::types::{DbId, Millis};
use bench_db::models::bench::BenchRecord;
use serde::Serialize;

/// The two timers a bench can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Pending,
    Owned,
}

/// Side effect requested by a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BenchEffect {
    /// (Re)start a timer; a running timer of the same kind is replaced.
    StartTimer(TimerKind),
    StopTimer(TimerKind),
    /// Changed cache fields to hand to the batcher.
    Changed(BenchCacheUpdate),
}

/// Public view of a bench: durable attributes plus ephemeral state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchSnapshot {
    #[serde(flatten)]
    pub info: BenchRecord,
    #[serde(flatten)]
    pub state: BenchCache,
}

pub struct BenchModel {
    info: BenchRecord,
    state: BenchCache,
    pending_max_time_ms: Millis,
    effects: Vec<BenchEffect>,
}

impl BenchModel {
    /// Build a model from its durable record and cache record.
    ///
    /// Timers matching the cached state are queued immediately, so a bench
    /// that was pending or owned before a restart resumes counting.
    pub fn new(info: BenchRecord, state: BenchCache, pending_max_time_ms: Millis) -> Self {
        let mut model = Self {
            info,
            state,
            pending_max_time_ms,
            effects: Vec::new(),
        };
        if model.state.pending {
            model.effects.push(BenchEffect::StartTimer(TimerKind::Pending));
        } else if model.state.owner.is_some() {
            model.effects.push(BenchEffect::StartTimer(TimerKind::Owned));
        }
        model
    }

    pub fn id(&self) -> DbId {
        self.info.id
    }

    pub fn info(&self) -> &BenchRecord {
        &self.info
    }

    pub fn state(&self) -> &BenchCache {
        &self.state
    }

    pub fn snapshot(&self) -> BenchSnapshot {
        BenchSnapshot {
            info: self.info.clone(),
            state: self.state.clone(),
        }
    }

    /// Drain the effects recorded since the last call.
    pub fn take_effects(&mut self) -> Vec<BenchEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Replace the durable attributes. Ephemeral state is untouched.
    pub fn update_info(&mut self, info: BenchRecord) {
        self.info = info;
    }

    // ---- commands ----

    /// A user asks for the bench, or confirms a pending hand-off.
    pub fn request(&mut self, user_id: DbId) {
        let bench_id = self.id();

        if self.state.owner == Some(user_id) {
            if self.state.pending {
                self.confirm();
            } else {
                tracing::info!(bench_id, user_id, "User already owns bench");
            }
            return;
        }

        if self.state.line.has(user_id) {
            tracing::info!(bench_id, user_id, "User already waiting for bench");
            return;
        }

        let mut delta = BenchCacheUpdate::new(bench_id);
        if self.state.owner.is_none() {
            self.state.owner = Some(user_id);
            self.state.pending = false;
            self.state.owned_time = 0;
            delta = delta
                .with_owner(Some(user_id))
                .with_pending(false)
                .with_owned_time(0);
            self.effects.push(BenchEffect::StartTimer(TimerKind::Owned));
            tracing::info!(bench_id, user_id, "Bench taken");
        } else {
            self.state.line.add(user_id);
            delta = delta.with_line(self.state.line.clone());
            tracing::info!(
                bench_id,
                user_id,
                position = self.state.line.size(),
                "User joined bench line"
            );
        }
        self.emit(delta);
    }

    /// A user releases the bench, declines a pending hand-off, or leaves the
    /// line.
    pub fn free(&mut self, user_id: DbId) {
        let bench_id = self.id();
        let mut delta = BenchCacheUpdate::new(bench_id);
        let mut acted = false;

        if self.state.owner == Some(user_id) {
            acted = true;
            if self.state.pending {
                self.effects.push(BenchEffect::StopTimer(TimerKind::Pending));
                self.state.pending = false;
                self.state.pending_time_left = self.pending_max_time_ms;
                delta = delta
                    .with_pending(false)
                    .with_pending_time_left(self.pending_max_time_ms);
                tracing::info!(bench_id, user_id, "Pending hand-off declined");
            } else {
                self.effects.push(BenchEffect::StopTimer(TimerKind::Owned));
                self.state.owned_time = 0;
                delta = delta.with_owned_time(0);
                tracing::info!(bench_id, user_id, "Bench released");
            }
            self.state.owner = None;
            delta = delta.with_owner(None);
            self.seek_next_owner(&mut delta);
        }

        if self.state.line.remove(user_id) {
            acted = true;
            delta = delta.with_line(self.state.line.clone());
            tracing::info!(bench_id, user_id, "User left bench line");
        }

        if acted {
            self.emit(delta);
        } else {
            tracing::info!(bench_id, user_id, "Free ignored, user neither owns nor waits");
        }
    }

    pub fn toggle_maintenance(&mut self) {
        self.state.maintenance = !self.state.maintenance;
        tracing::info!(
            bench_id = self.id(),
            maintenance = self.state.maintenance,
            "Bench maintenance toggled"
        );
        let delta = BenchCacheUpdate::new(self.id()).with_maintenance(self.state.maintenance);
        self.emit(delta);
    }

    // ---- timers ----

    /// One pending-timer tick. Expiry declines on the owner's behalf.
    pub fn tick_pending(&mut self, tick_ms: Millis) {
        if !self.state.pending {
            return;
        }
        let left = self.state.pending_time_left - tick_ms;
        if left <= 0 {
            if let Some(owner) = self.state.owner {
                tracing::info!(bench_id = self.id(), user_id = owner, "Pending hand-off expired");
                self.free(owner);
            }
            return;
        }
        tracing::trace!(bench_id = self.id(), left, "Pending tick");
        self.state.pending_time_left = left;
        self.emit(BenchCacheUpdate::new(self.id()).with_pending_time_left(left));
    }

    /// One owned-timer tick.
    pub fn tick_owned(&mut self, tick_ms: Millis) {
        if self.state.owner.is_none() || self.state.pending {
            return;
        }
        self.state.owned_time += tick_ms;
        tracing::trace!(bench_id = self.id(), owned = self.state.owned_time, "Owned tick");
        self.emit(BenchCacheUpdate::new(self.id()).with_owned_time(self.state.owned_time));
    }

    // ---- private helpers ----

    /// Complete a pending hand-off.
    fn confirm(&mut self) {
        let bench_id = self.id();
        self.effects.push(BenchEffect::StopTimer(TimerKind::Pending));
        self.state.pending = false;
        self.state.pending_time_left = self.pending_max_time_ms;
        self.state.owned_time = 0;
        self.effects.push(BenchEffect::StartTimer(TimerKind::Owned));
        tracing::info!(bench_id, user_id = ?self.state.owner, "Bench hand-off confirmed");
        self.emit(
            BenchCacheUpdate::new(bench_id)
                .with_pending(false)
                .with_pending_time_left(self.pending_max_time_ms)
                .with_owned_time(0),
        );
    }

    /// Offer the bench to the head of the line, if any.
    fn seek_next_owner(&mut self, delta: &mut BenchCacheUpdate) {
        let Some(next) = self.state.line.pop_front() else {
            return;
        };
        self.state.owner = Some(next);
        self.state.pending = true;
        self.state.pending_time_left = self.pending_max_time_ms;
        self.state.owned_time = 0;
        self.effects.push(BenchEffect::StartTimer(TimerKind::Pending));
        delta.merge(
            BenchCacheUpdate::new(self.id())
                .with_owner(Some(next))
                .with_pending(true)
                .with_pending_time_left(self.pending_max_time_ms)
                .with_owned_time(0)
                .with_line(self.state.line.clone()),
        );
        tracing::info!(bench_id = self.id(), user_id = next, "Bench offered to next in line");
    }

    fn emit(&mut self, delta: BenchCacheUpdate) {
        if !delta.is_empty() {
            self.effects.push(BenchEffect::Changed(delta));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
