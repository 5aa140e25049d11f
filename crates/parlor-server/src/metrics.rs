//! Prometheus recorder install and the metric names this server emits.

use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Sessions created total (counter).
pub const SESSIONS_CREATED_TOTAL: &str = "sessions_created_total";
/// Sessions expired by the idle sweeper (counter).
pub const SESSIONS_EXPIRED_TOTAL: &str = "sessions_expired_total";
/// Moves applied total (counter).
pub const MOVES_APPLIED_TOTAL: &str = "moves_applied_total";
/// Moves rejected total (counter, labels: reason).
pub const MOVES_REJECTED_TOTAL: &str = "moves_rejected_total";
/// Connections accepted over the lifetime of the process (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Connections torn down, any reason (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Currently attached connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Frames lost to full or closed outbound queues (counter).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";

/// Install the process-global Prometheus recorder and return the handle
/// that renders `/metrics`.
///
/// If a recorder is already installed in this process (a second server in
/// the same test binary), falls back to a detached recorder whose handle
/// renders an empty exposition instead of panicking.
pub fn install_recorder() -> PrometheusHandle {
    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("prometheus metrics recorder installed");
            handle
        }
        Err(_) => PrometheusBuilder::new().build_recorder().handle(),
    };
    describe_metrics();
    handle
}

/// Register help text for every metric this server emits.
pub fn describe_metrics() {
    describe_counter!(SESSIONS_CREATED_TOTAL, "Sessions created over HTTP");
    describe_counter!(
        SESSIONS_EXPIRED_TOTAL,
        "Idle sessions removed by the expiry sweeper"
    );
    describe_counter!(MOVES_APPLIED_TOTAL, "Moves accepted and broadcast");
    describe_counter!(MOVES_REJECTED_TOTAL, "Moves rejected, labelled by reason");
    describe_counter!(WS_CONNECTIONS_TOTAL, "WebSocket connections accepted");
    describe_counter!(WS_DISCONNECTIONS_TOTAL, "WebSocket connections closed");
    describe_gauge!(
        WS_CONNECTIONS_ACTIVE,
        "WebSocket connections currently open"
    );
    describe_counter!(
        WS_BROADCAST_DROPS_TOTAL,
        "Broadcast frames dropped on full send queues"
    );
}

/// Render the Prometheus text exposition.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
