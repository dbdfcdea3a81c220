//! Transport-independent command execution.
//!
//! Both `POST /api/v1/commands` and WebSocket `request` frames funnel
//! through [`dispatch`].

use bench_core::protocol::{AdminAction, Command, CommandResponse};
use bench_engine::BenchManager;

/// Run any client command against the engine and acknowledge it.
///
/// Ownership commands acknowledge with the bench's resulting state, or
/// fail if the bench or user is unknown.
pub async fn dispatch(engine: &BenchManager, command: Command) -> CommandResponse {
    match command {
        Command::Ownership(cmd) => match engine.handle_ownership_command(&cmd).await {
            Some(snapshot) => match serde_json::to_value(snapshot) {
                Ok(data) => CommandResponse::ok(Some(data)),
                Err(e) => CommandResponse::failed(e.to_string()),
            },
            None => CommandResponse::failed(format!(
                "Command rejected for resource {} and requester {}",
                cmd.resource_id, cmd.requester_id
            )),
        },
        Command::Crud(cmd) => engine.apply_crud_effect(&cmd).await,
        Command::Admin(cmd) => match cmd.command {
            AdminAction::ResetCache => match engine.reset_cache().await {
                Ok(()) => CommandResponse::ok(None),
                Err(e) => {
                    tracing::error!(error = %e, "Cache reset failed");
                    CommandResponse::failed(e.to_string())
                }
            },
        },
    }
}
