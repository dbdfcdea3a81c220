//! WebSocket frame shapes.
//!
//! Client → server:
//!
//! ```text
//! { "type": "publish", "payload": <ownership command> }
//! { "type": "request", "requestId": <any>, "payload": <command> }
//! ```
//!
//! Server → client:
//!
//! ```text
//! { "type": "event", "payload": <event> }
//! { "type": "response", "requestId": <echoed>, "success": bool, "data"?: ... }
//! { "type": "error", "message": "..." }
//! ```

use axum::extract::ws::Message;
use bench_core::error::CoreError;
use bench_core::protocol::{Command, CommandResponse, OwnershipCommand};
use bench_engine::manager::StateSnapshot;
use bench_events::BusEvent;
use serde::{Deserialize, Serialize};

/// A frame sent by a client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    /// Fire-and-forget ownership command. Its effects arrive as events.
    Publish { payload: OwnershipCommand },

    /// A command that expects a `response` frame with the same `requestId`.
    Request {
        #[serde(rename = "requestId")]
        request_id: serde_json::Value,
        payload: Command,
    },
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        serde_json::from_str(text)
            .map_err(|e| CoreError::Validation(format!("Malformed frame: {e}")))
    }
}

/// The state snapshot a client receives on (re)connect.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SnapshotEvent {
    InitialState(StateSnapshot),
}

/// Payload of an `event` frame.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Snapshot(SnapshotEvent),
    Bus(BusEvent),
}

/// A frame sent to a client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerFrame {
    Event {
        payload: EventPayload,
    },
    Response {
        #[serde(rename = "requestId")]
        request_id: serde_json::Value,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
    },
    Error {
        message: String,
    },
}

impl ServerFrame {
    pub fn initial_state(state: StateSnapshot) -> Self {
        ServerFrame::Event {
            payload: EventPayload::Snapshot(SnapshotEvent::InitialState(state)),
        }
    }

    pub fn event(event: BusEvent) -> Self {
        ServerFrame::Event {
            payload: EventPayload::Bus(event),
        }
    }

    pub fn response(request_id: serde_json::Value, response: CommandResponse) -> Self {
        ServerFrame::Response {
            request_id,
            success: response.success,
            data: response.data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }

    /// Serialize into a text message.
    pub fn to_message(&self) -> Result<Message, serde_json::Error> {
        let text = serde_json::to_string(self)?;
        Ok(Message::Text(text.into()))
    }
}
