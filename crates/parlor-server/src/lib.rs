//! # parlor-server
//!
//! Axum HTTP + `WebSocket` server and state broadcasting.
//!
//! - HTTP endpoints: session create/join, liveness, health, metrics
//! - `WebSocket` gateway at `/connect/{session_id}`: per-connection task,
//!   heartbeat, move dispatch
//! - State fan-out per session via the [`websocket::hub::ConnectionHub`]
//! - Idle-session expiry sweeper
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod expiry;
pub mod health;
pub mod http;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::{AppState, ParlorServer};
