//! WebSocket connection management, heartbeat, and per-session fan-out.

pub mod connection;
pub mod heartbeat;
pub mod hub;
pub mod session;
