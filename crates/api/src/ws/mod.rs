//! WebSocket infrastructure for real-time communication.
//!
//! Provides connection management, the frame protocol, heartbeat
//! monitoring, and the HTTP upgrade handler used by Axum routes.

mod handler;
mod heartbeat;
pub mod manager;
pub mod protocol;

pub use handler::{handle_text_frame, ws_handler};
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
