use std::sync::Arc;
use std::time::Duration;

use bench_events::{BusEvent, EventBus};
use tokio_util::sync::CancellationToken;

use crate::ws::manager::WsManager;

/// Spawn a background task that pings every WebSocket client and publishes
/// a `heartbeat` event once per `period`.
///
/// The task runs until `cancel` is triggered.
pub fn start_heartbeat(
    ws_manager: Arc<WsManager>,
    bus: Arc<EventBus>,
    period: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Heartbeat stopping");
                    break;
                }
                _ = interval.tick() => {
                    let count = ws_manager.connection_count().await;
                    tracing::debug!(count, "WebSocket heartbeat ping");
                    ws_manager.ping_all().await;
                    bus.publish(BusEvent::heartbeat());
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use axum::extract::ws::Message;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pings_and_publishes_each_period() {
        let ws_manager = Arc::new(WsManager::new());
        let bus = Arc::new(EventBus::default());
        let mut events = bus.subscribe();
        let mut rx = ws_manager.add("conn-1".to_string()).await;
        let cancel = CancellationToken::new();

        let handle = start_heartbeat(
            Arc::clone(&ws_manager),
            Arc::clone(&bus),
            Duration::from_secs(30),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(matches!(rx.try_recv(), Ok(Message::Ping(_))));
        assert!(matches!(events.try_recv(), Ok(BusEvent::Heartbeat { .. })));

        cancel.cancel();
        handle.await.unwrap();
    }
}
