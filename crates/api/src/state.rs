use std::sync::Arc;

use bench_engine::BenchManager;
use bench_events::EventBus;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: bench_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Bench ownership engine.
    pub engine: Arc<BenchManager>,
    /// Bus the engine publishes cache and entity events on.
    pub event_bus: Arc<EventBus>,
}
