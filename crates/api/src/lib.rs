//! Bench arbiter API server library.
//!
//! Exposes config, state, error handling, routes and the WebSocket layer so
//! integration tests and the binary entrypoint share one router.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod notifications;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
