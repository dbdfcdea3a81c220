//! Command and response shapes exchanged with clients.
//!
//! Transport-agnostic: the WebSocket layer wraps these in its own frames.
//! Older clients used `bench-*` command names and `bench`/`user` entity
//! names; those are accepted as aliases.

use serde::{Deserialize, Serialize};

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

/// The two durable entity kinds the engine manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entity {
    #[serde(rename = "resource", alias = "bench")]
    Bench,
    #[serde(rename = "requester", alias = "user")]
    User,
}

impl Entity {
    /// Human-readable name used in errors and log fields.
    pub fn name(self) -> &'static str {
        match self {
            Entity::Bench => "Bench",
            Entity::User => "User",
        }
    }
}

/// What happened to an entity as a result of a CRUD command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    Created,
    Updated,
    Removed,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OwnershipAction {
    #[serde(alias = "bench-request", alias = "bench-occupied-confirm")]
    RequestResource,
    #[serde(alias = "bench-free")]
    FreeResource,
    #[serde(alias = "bench-toggle-maintenance")]
    ToggleMaintenance,
}

/// Request, release, or flag a bench on behalf of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipCommand {
    pub command: OwnershipAction,
    #[serde(alias = "benchId")]
    pub resource_id: DbId,
    #[serde(alias = "userId")]
    pub requester_id: DbId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrudAction {
    CreateEntity,
    UpdateEntity,
    DeleteEntity,
}

impl CrudAction {
    /// The change a successful command of this kind produces.
    pub fn change_kind(self) -> ChangeKind {
        match self {
            CrudAction::CreateEntity => ChangeKind::Created,
            CrudAction::UpdateEntity => ChangeKind::Updated,
            CrudAction::DeleteEntity => ChangeKind::Removed,
        }
    }
}

/// Create, update or delete a durable entity.
///
/// `data` holds the entity fields; `id` is required for update and delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrudCommand {
    pub command: CrudAction,
    pub entity: Entity,
    pub data: serde_json::Value,
}

impl CrudCommand {
    /// The `id` field of `data`, if present and numeric.
    pub fn target_id(&self) -> Option<DbId> {
        self.data.get("id").and_then(serde_json::Value::as_i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdminAction {
    ResetCache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCommand {
    pub command: AdminAction,
}

/// Any command a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    Ownership(OwnershipCommand),
    Crud(CrudCommand),
    Admin(AdminCommand),
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Acknowledgement for a CRUD or administrative command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandResponse {
    pub fn ok(data: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            data,
        }
    }

    /// A failed acknowledgement carrying `{ "error": message }`.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Some(serde_json::json!({ "error": message.into() })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ownership_command() {
        let cmd: Command = serde_json::from_str(
            r#"{"command": "request-resource", "resourceId": 42, "requesterId": 1}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::Ownership(OwnershipCommand {
                command: OwnershipAction::RequestResource,
                resource_id: 42,
                requester_id: 1,
            })
        );
    }

    #[test]
    fn parses_legacy_ownership_names() {
        let cmd: OwnershipCommand =
            serde_json::from_str(r#"{"command": "bench-free", "benchId": 3, "userId": 9}"#)
                .unwrap();
        assert_eq!(cmd.command, OwnershipAction::FreeResource);
        assert_eq!(cmd.resource_id, 3);
        assert_eq!(cmd.requester_id, 9);

        let confirm: OwnershipCommand = serde_json::from_str(
            r#"{"command": "bench-occupied-confirm", "benchId": 3, "userId": 9}"#,
        )
        .unwrap();
        assert_eq!(confirm.command, OwnershipAction::RequestResource);
    }

    #[test]
    fn parses_crud_command() {
        let cmd: Command = serde_json::from_str(
            r#"{"command": "update-entity", "entity": "requester", "data": {"id": 5, "name": "Ann"}}"#,
        )
        .unwrap();
        match cmd {
            Command::Crud(crud) => {
                assert_eq!(crud.command, CrudAction::UpdateEntity);
                assert_eq!(crud.entity, Entity::User);
                assert_eq!(crud.target_id(), Some(5));
            }
            other => panic!("expected CRUD command, got {other:?}"),
        }
    }

    #[test]
    fn parses_reset_cache() {
        let cmd: Command = serde_json::from_str(r#"{"command": "reset-cache"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Admin(AdminCommand {
                command: AdminAction::ResetCache
            })
        );
    }

    #[test]
    fn rejects_unknown_command() {
        let parsed = serde_json::from_str::<Command>(r#"{"command": "launch-rocket"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn entity_accepts_legacy_names() {
        let bench: Entity = serde_json::from_str(r#""bench""#).unwrap();
        assert_eq!(bench, Entity::Bench);
        assert_eq!(serde_json::to_string(&Entity::User).unwrap(), r#""requester""#);
    }

    #[test]
    fn failed_response_carries_error_message() {
        let resp = CommandResponse::failed("boom");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["data"]["error"], "boom");

        let ok = serde_json::to_value(CommandResponse::ok(None)).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true}));
    }
}
