//! Delivery of bus events to connected clients.

pub mod forwarder;

pub use forwarder::EventForwarder;
