use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::post, Json, Router};
use bench_core::protocol::{Command, CommandResponse};

use crate::dispatch::dispatch;
use crate::state::AppState;

/// POST /commands -- run one command and acknowledge it.
///
/// Rejected commands answer 422 with the same `{ success, data }` body.
async fn run_command(
    State(state): State<AppState>,
    Json(command): Json<Command>,
) -> (StatusCode, Json<CommandResponse>) {
    let response = dispatch(&state.engine, command).await;
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/commands", post(run_command))
}
