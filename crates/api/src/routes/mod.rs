pub mod admin;
pub mod commands;
pub mod health;
pub mod state;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                      WebSocket
/// /state                   full bench and user snapshot (GET)
/// /commands                run a CRUD, ownership or admin command (POST)
/// /admin/reset-cache       rebuild ephemeral state from the database (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(state::router())
        .merge(commands::router())
        .nest("/admin", admin::router())
}
