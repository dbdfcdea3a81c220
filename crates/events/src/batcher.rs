//! Time-windowed coalescing of one bench's cache deltas.
//!
//! A bench emits a [`BenchCacheUpdate`] for every mutation and every timer
//! tick. [`ChangeBatcher`] folds everything received during one window into a
//! single delta (later fields win), merges it into the [`CacheStore`] and
//! publishes it on the [`EventBus`].

use std::sync::Arc;
use std::time::Duration;

use bench_core::cache::{BenchCacheUpdate, CacheStore};
use bench_core::types::DbId;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::bus::{BusEvent, EventBus};

/// Per-bench batching consumer. Run it with [`ChangeBatcher::run`] in its own
/// task.
pub struct ChangeBatcher {
    bench_id: DbId,
    window: Duration,
    cache: Arc<dyn CacheStore>,
    bus: Arc<EventBus>,
    /// Delta collected during the current window.
    window_delta: Option<BenchCacheUpdate>,
    /// Delta that was published but could not be written to the store yet.
    unsaved: Option<BenchCacheUpdate>,
}

impl ChangeBatcher {
    pub fn new(
        bench_id: DbId,
        window: Duration,
        cache: Arc<dyn CacheStore>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            bench_id,
            window,
            cache,
            bus,
            window_delta: None,
            unsaved: None,
        }
    }

    /// Run the batching loop.
    ///
    /// Exits after a final flush when every sender of `receiver` has been
    /// dropped, or immediately (without flushing) when `cancel` fires.
    pub async fn run(
        mut self,
        mut receiver: mpsc::UnboundedReceiver<BenchCacheUpdate>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.window);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(bench_id = self.bench_id, "Change batcher started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(bench_id = self.bench_id, "Change batcher cancelled");
                    break;
                }
                received = receiver.recv() => match received {
                    Some(update) => self.collect(update),
                    None => {
                        self.flush().await;
                        tracing::debug!(bench_id = self.bench_id, "Change batcher drained");
                        break;
                    }
                },
                _ = ticker.tick() => self.flush().await,
            }
        }
    }

    fn collect(&mut self, update: BenchCacheUpdate) {
        match &mut self.window_delta {
            Some(delta) => delta.merge(update),
            None => self.window_delta = Some(update),
        }
    }

    /// Publish the current window and write it (plus any unsaved remainder)
    /// through to the cache store.
    async fn flush(&mut self) {
        if let Some(delta) = self.window_delta.take().filter(|d| !d.is_empty()) {
            self.bus.publish(BusEvent::cache_update(delta.clone()));
            match &mut self.unsaved {
                Some(unsaved) => unsaved.merge(delta),
                None => self.unsaved = Some(delta),
            }
        }

        let Some(pending) = self.unsaved.take() else {
            return;
        };

        if let Err(e) = self.cache.merge_partial(&pending).await {
            tracing::error!(
                bench_id = self.bench_id,
                error = %e,
                "Failed to write bench changes to cache, retrying next window"
            );
            self.unsaved = Some(pending);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
