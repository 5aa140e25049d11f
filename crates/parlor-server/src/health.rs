//! Liveness report served at `/health`.

use std::time::Instant;

use serde::Serialize;

use parlor_session::MovePolicy;

/// Everything a probe needs in one flat object: uptime, the two counts
/// operators actually watch, and the move policing mode so a client can
/// tell which posture the server runs before connecting.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`; the endpoint answering at all is the signal.
    pub status: &'static str,
    /// Whole seconds since the server booted.
    pub uptime_secs: u64,
    /// WebSocket connections currently attached.
    pub connections: usize,
    /// Sessions currently held by the registry.
    pub active_sessions: usize,
    /// The policing mode every session runs under.
    pub move_policy: MovePolicy,
}

impl HealthResponse {
    /// Assemble the report from live counters.
    #[must_use]
    pub fn report(
        started: Instant,
        policy: MovePolicy,
        connections: usize,
        sessions: usize,
    ) -> Self {
        Self {
            status: "ok",
            uptime_secs: started.elapsed().as_secs(),
            connections,
            active_sessions: sessions,
            move_policy: policy,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
