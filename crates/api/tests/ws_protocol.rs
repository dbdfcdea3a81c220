//! Frame parsing, serialization and dispatch for the WebSocket protocol.

mod common;

use assert_matches::assert_matches;
use bench_api::ws::handle_text_frame;
use bench_api::ws::protocol::{ClientFrame, ServerFrame};
use bench_core::protocol::{Command, CommandResponse, OwnershipAction};
use bench_events::BusEvent;
use serde_json::json;

fn to_json(frame: &ServerFrame) -> serde_json::Value {
    serde_json::to_value(frame).unwrap()
}

#[test]
fn publish_frame_carries_an_ownership_command() {
    let frame = ClientFrame::parse(
        r#"{"type":"publish","payload":{"command":"request-resource","resourceId":4,"requesterId":7}}"#,
    )
    .unwrap();

    assert_matches!(frame, ClientFrame::Publish { payload } => {
        assert_eq!(payload.command, OwnershipAction::RequestResource);
        assert_eq!(payload.resource_id, 4);
        assert_eq!(payload.requester_id, 7);
    });
}

#[test]
fn request_frame_accepts_crud_and_admin_commands() {
    let frame = ClientFrame::parse(
        r#"{"type":"request","requestId":"r1","payload":{"command":"delete-entity","entity":"requester","data":{"id":3}}}"#,
    )
    .unwrap();
    assert_matches!(frame, ClientFrame::Request { request_id, payload: Command::Crud(cmd) } => {
        assert_eq!(request_id, json!("r1"));
        assert_eq!(cmd.target_id(), Some(3));
    });

    let frame =
        ClientFrame::parse(r#"{"type":"request","requestId":9,"payload":{"command":"reset-cache"}}"#)
            .unwrap();
    assert_matches!(frame, ClientFrame::Request { payload: Command::Admin(_), .. });
}

#[test]
fn malformed_frames_are_validation_errors() {
    assert!(ClientFrame::parse("not json").is_err());
    assert!(ClientFrame::parse(r#"{"type":"subscribe"}"#).is_err());
    assert!(ClientFrame::parse(r#"{"type":"publish","payload":{"command":"launch"}}"#).is_err());
}

#[test]
fn response_frame_echoes_request_id() {
    let ok = ServerFrame::response(json!("r1"), CommandResponse::ok(None));
    assert_eq!(to_json(&ok), json!({"type": "response", "requestId": "r1", "success": true}));

    let failed = ServerFrame::response(json!(2), CommandResponse::failed("boom"));
    assert_eq!(
        to_json(&failed),
        json!({"type": "response", "requestId": 2, "success": false, "data": {"error": "boom"}})
    );
}

#[test]
fn bus_events_are_wrapped_in_event_frames() {
    let frame = to_json(&ServerFrame::event(BusEvent::heartbeat()));
    assert_eq!(frame["type"], "event");
    assert_eq!(frame["payload"]["event"], "heartbeat");
    assert!(frame["payload"]["timestamp"].is_string());
}

#[tokio::test]
async fn initial_state_frame_lists_resources_and_requesters() {
    let t = common::test_engine().await;

    let frame = to_json(&ServerFrame::initial_state(t.engine.get_state().await));

    assert_eq!(frame["type"], "event");
    let payload = &frame["payload"];
    assert_eq!(payload["event"], "initial-state");
    assert_eq!(payload["version"], 1);
    assert_eq!(payload["resources"][0]["name"], "R42");
    assert_eq!(payload["resources"][0]["owner"], serde_json::Value::Null);
    assert_eq!(payload["requesters"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn publish_applies_without_replying() {
    let t = common::test_engine().await;
    let text = json!({
        "type": "publish",
        "payload": {"command": "request-resource", "resourceId": t.r42.id, "requesterId": t.ann.id}
    })
    .to_string();

    assert!(handle_text_frame(&t.engine, &text).await.is_none());

    let state = t.engine.get_raw_state().await;
    assert_eq!(state.benches[0].state.owner, Some(t.ann.id));
}

#[tokio::test]
async fn request_replies_with_the_command_outcome() {
    let t = common::test_engine().await;
    let text = json!({
        "type": "request",
        "requestId": "create-1",
        "payload": {"command": "create-entity", "entity": "resource", "data": {"name": "R7"}}
    })
    .to_string();

    let reply = handle_text_frame(&t.engine, &text).await.unwrap();
    let reply = to_json(&reply);
    assert_eq!(reply["type"], "response");
    assert_eq!(reply["requestId"], "create-1");
    assert_eq!(reply["success"], true);
    assert_eq!(reply["data"]["name"], "R7");
    assert_eq!(reply["data"]["owner"], serde_json::Value::Null);

    let duplicate = handle_text_frame(&t.engine, &text).await.unwrap();
    let duplicate = to_json(&duplicate);
    assert_eq!(duplicate["success"], false);
    assert!(duplicate["data"]["error"].as_str().unwrap().contains("R7"));
}

#[tokio::test]
async fn ownership_request_for_unknown_bench_fails() {
    let t = common::test_engine().await;
    let text = json!({
        "type": "request",
        "requestId": 1,
        "payload": {"command": "free-resource", "resourceId": 999, "requesterId": t.ann.id}
    })
    .to_string();

    let reply = to_json(&handle_text_frame(&t.engine, &text).await.unwrap());
    assert_eq!(reply["success"], false);
}

#[tokio::test]
async fn garbage_gets_an_error_frame() {
    let t = common::test_engine().await;

    let reply = handle_text_frame(&t.engine, "{").await.unwrap();
    assert_matches!(reply, ServerFrame::Error { message } => {
        assert!(message.starts_with("Validation failed"));
    });
}
