use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use bench_engine::BenchManager;
use futures::{SinkExt, StreamExt};

use crate::dispatch::dispatch;
use crate::state::AppState;
use crate::ws::protocol::{ClientFrame, ServerFrame};

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single WebSocket connection after upgrade.
///
/// 1. Registers the connection with `WsManager`.
/// 2. Queues the initial-state snapshot.
/// 3. Spawns a sender task that forwards messages from the manager channel.
/// 4. Processes inbound frames on the current task.
/// 5. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    // Register before taking the snapshot so no event falls between the two.
    let mut rx = state.ws_manager.add(conn_id.clone()).await;
    let snapshot = ServerFrame::initial_state(state.engine.get_state().await);
    send_frame(&state, &conn_id, &snapshot).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Some(reply) = handle_text_frame(&state.engine, &text).await {
                    send_frame(&state, &conn_id, &reply).await;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

/// Execute one inbound text frame and return the reply to send back, if any.
///
/// `publish` frames never reply; their effects reach every client as
/// events. Malformed frames get an `error` frame.
pub async fn handle_text_frame(engine: &BenchManager, text: &str) -> Option<ServerFrame> {
    match ClientFrame::parse(text) {
        Ok(ClientFrame::Publish { payload }) => {
            engine.handle_ownership_command(&payload).await;
            None
        }
        Ok(ClientFrame::Request {
            request_id,
            payload,
        }) => {
            let response = dispatch(engine, payload).await;
            Some(ServerFrame::response(request_id, response))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected WebSocket frame");
            Some(ServerFrame::error(e.to_string()))
        }
    }
}

async fn send_frame(state: &AppState, conn_id: &str, frame: &ServerFrame) {
    match frame.to_message() {
        Ok(message) => {
            state.ws_manager.send_to(conn_id, message).await;
        }
        Err(e) => {
            tracing::error!(conn_id = %conn_id, error = %e, "Failed to serialize WebSocket frame");
        }
    }
}
