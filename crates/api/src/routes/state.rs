use axum::extract::State;
use axum::{routing::get, Json, Router};
use bench_engine::manager::StateSnapshot;

use crate::response::DataResponse;
use crate::state::AppState;

/// GET /state -- every bench and user as a client sees them on connect.
async fn get_state(State(state): State<AppState>) -> Json<DataResponse<StateSnapshot>> {
    Json(DataResponse {
        data: state.engine.get_state().await,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/state", get(get_state))
}
