//! Bench event bus and change-notification batching.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`BusEvent`]: the events broadcast to every connected observer.
//! - [`ChangeBatcher`]: coalesces one bench's cache deltas per time window,
//!   writes them through to the cache store and publishes them on the bus.

pub mod batcher;
pub mod bus;

pub use batcher::ChangeBatcher;
pub use bus::{BusEvent, EventBus};
