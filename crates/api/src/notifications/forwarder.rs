//! Event-to-WebSocket forwarding.
//!
//! [`EventForwarder`] subscribes to the event bus and broadcasts every
//! event to all WebSocket connections as an `event` frame.

use std::sync::Arc;

use bench_events::BusEvent;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::ws::protocol::ServerFrame;
use crate::ws::WsManager;

pub struct EventForwarder {
    ws_manager: Arc<WsManager>,
}

impl EventForwarder {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run until `cancel` fires or the bus is dropped.
    ///
    /// A lagging receiver skips the dropped events; clients recover on
    /// their next reconnect snapshot.
    pub async fn run(self, mut receiver: broadcast::Receiver<BusEvent>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Event forwarder stopping");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(event) => self.forward(event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Event forwarder lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Event bus closed, event forwarder shutting down");
                        break;
                    }
                },
            }
        }
    }

    async fn forward(&self, event: BusEvent) {
        match ServerFrame::event(event).to_message() {
            Ok(message) => self.ws_manager.broadcast(message).await,
            Err(e) => tracing::error!(error = %e, "Failed to serialize event frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::ws::Message;
    use bench_events::EventBus;

    use super::*;

    #[tokio::test]
    async fn forwards_events_as_frames() {
        let ws_manager = Arc::new(WsManager::new());
        let mut rx = ws_manager.add("conn-1".to_string()).await;
        let bus = EventBus::default();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(
            EventForwarder::new(Arc::clone(&ws_manager)).run(bus.subscribe(), cancel.clone()),
        );
        bus.publish(BusEvent::heartbeat());

        let Some(Message::Text(text)) = rx.recv().await else {
            panic!("expected a text frame");
        };
        let frame: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(frame["type"], "event");
        assert_eq!(frame["payload"]["event"], "heartbeat");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stops_when_bus_is_dropped() {
        let bus = EventBus::default();
        let receiver = bus.subscribe();
        drop(bus);

        EventForwarder::new(Arc::new(WsManager::new()))
            .run(receiver, CancellationToken::new())
            .await;
    }
}
