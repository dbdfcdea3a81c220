//! Engine tunables.

use std::time::Duration;

use bench_core::cache::{DEFAULT_BATCH_WINDOW_MS, DEFAULT_PENDING_MAX_TIME_MS, DEFAULT_TICK_MS};
use bench_core::types::Millis;

/// Timer and batching settings shared by every bench.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Time a pending owner has to confirm a hand-off.
    pub pending_max_time_ms: Millis,
    /// Resolution of the pending and owned timers.
    pub tick_ms: Millis,
    /// Length of one change-notification window.
    pub batch_window_ms: Millis,
}

impl EngineConfig {
    pub fn tick(&self) -> Duration {
        millis_to_duration(self.tick_ms)
    }

    /// Milliseconds a timer advances per tick; always equal to [`tick`](Self::tick).
    pub fn tick_step_ms(&self) -> Millis {
        self.tick_ms.max(1)
    }

    pub fn batch_window(&self) -> Duration {
        millis_to_duration(self.batch_window_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pending_max_time_ms: DEFAULT_PENDING_MAX_TIME_MS,
            tick_ms: DEFAULT_TICK_MS,
            batch_window_ms: DEFAULT_BATCH_WINDOW_MS,
        }
    }
}

/// Negative or zero values fall back to one millisecond; `tokio::time::interval`
/// panics on a zero period.
fn millis_to_duration(ms: Millis) -> Duration {
    Duration::from_millis(ms.max(1) as u64)
}
