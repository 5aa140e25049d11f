//! Pong-watching liveness check for attached clients.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use super::connection::ClientConnection;

/// What ended a heartbeat watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The missed-pong budget ran out; the connection should be closed.
    TimedOut,
    /// The watch was cancelled (connection teardown or server shutdown).
    Cancelled,
}

/// Watch a connection's alive flag and report when the client goes quiet.
///
/// The socket task flips the flag on every Pong (and on inbound traffic);
/// this loop clears it once per `interval` tick and counts consecutive
/// ticks where nobody flipped it back. After `timeout / interval` misses
/// in a row (at least one) the client is declared dead.
pub async fn run_heartbeat(
    connection: Arc<ClientConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    #[allow(clippy::cast_possible_truncation)]
    let max_missed = (timeout.as_millis() / interval.as_millis().max(1)).max(1) as u32;
    let mut missed_pongs: u32 = 0;
    let mut ticks = time::interval(interval);

    loop {
        tokio::select! {
            // check_alive clears the flag, so a pong must land before the
            // next tick to count.
            _ = ticks.tick() => {
                if connection.check_alive() {
                    missed_pongs = 0;
                } else {
                    missed_pongs += 1;
                    if missed_pongs >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                }
            }
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
