//! Idle-session expiry.
//!
//! Abandoned sessions accumulate in the registry when clients create one
//! and walk away. A background sweeper drops any session that has no
//! attached connections and no recorded activity inside the retention
//! window. A session with even one live connection is never expired.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use parlor_session::SessionRegistry;

use crate::metrics::SESSIONS_EXPIRED_TOTAL;
use crate::websocket::hub::ConnectionHub;

/// Drop every session that is both unattended and idle past `retention`.
///
/// Returns how many sessions were removed.
pub fn sweep_expired(
    registry: &SessionRegistry,
    hub: &ConnectionHub,
    retention: Duration,
) -> usize {
    let mut removed = 0;
    for (id, session) in registry.sessions() {
        if hub.connections_in(&id) == 0
            && session.idle_for() > retention
            && registry.remove(&id)
        {
            counter!(SESSIONS_EXPIRED_TOTAL).increment(1);
            info!(
                session_id = %id,
                idle_secs = session.idle_for().as_secs(),
                "expired idle session"
            );
            removed += 1;
        }
    }
    removed
}

/// Run the periodic expiry sweeper until cancelled.
pub fn run_expiry_sweeper(
    registry: Arc<SessionRegistry>,
    hub: Arc<ConnectionHub>,
    retention: Duration,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = sweep_expired(&registry, &hub, retention);
                    if removed > 0 {
                        debug!(removed, "expiry sweep");
                    }
                }
                () = cancel.cancelled() => break,
            }
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
