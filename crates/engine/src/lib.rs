//! Bench ownership engine.
//!
//! Each bench runs as an actor task ([`actor`]) wrapping the synchronous
//! state machine in [`model::bench`]. The [`manager::BenchManager`] owns the
//! bench and user registries, reconciles the ephemeral cache with the
//! durable store on startup, and routes ownership and CRUD commands.

pub mod actor;
pub mod cache;
pub mod config;
pub mod durable;
pub mod error;
pub mod manager;
pub mod model;
pub mod registry;

pub use config::EngineConfig;
pub use error::EngineError;
pub use manager::BenchManager;
