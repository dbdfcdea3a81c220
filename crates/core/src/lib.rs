//! Shared domain types for the bench arbiter.
//!
//! Pure data and logic only: the FIFO [`line::Line`], the ephemeral cache
//! record and its delta type, the [`cache::CacheStore`] seam, and the
//! command/response wire protocol. Nothing here touches the database or
//! spawns tasks.

pub mod cache;
pub mod error;
pub mod line;
pub mod protocol;
pub mod types;
