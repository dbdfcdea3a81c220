use axum::extract::State;
use axum::{routing::post, Json, Router};
use bench_core::protocol::CommandResponse;

use crate::error::AppResult;
use crate::state::AppState;

/// POST /admin/reset-cache -- drop all ephemeral bench state and rebuild it
/// from the durable records.
async fn reset_cache(State(state): State<AppState>) -> AppResult<Json<CommandResponse>> {
    state.engine.reset_cache().await?;
    Ok(Json(CommandResponse::ok(None)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/reset-cache", post(reset_cache))
}
