//! Per-session connection buckets and state fan-out.
//!
//! The hub is fully synchronous: a `parking_lot::RwLock` around the bucket
//! map and `try_send` into each connection's outbound queue. No lock is
//! ever held across socket I/O, so the protocol handler may broadcast
//! while still holding a session's table guard; enqueue order then equals
//! commit order for that session.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use parking_lot::RwLock;
use tracing::{debug, warn};

use parlor_core::{ConnectionId, Mark, ServerEvent, SessionId};

use crate::metrics::WS_BROADCAST_DROPS_TOTAL;

use super::connection::ClientConnection;

/// Seats handed out per session, in claim order.
const SEATS: [Mark; 2] = [Mark::X, Mark::O];

/// Dropped-send budget per connection.
///
/// One full queue is a client that fell behind; a queue still full after
/// this many failed enqueues is a client that stopped draining, and it
/// no longer receives updates anyway.
pub const MAX_SEND_DROPS: u64 = 8;

/// Tracks which connections are attached to which session and fans
/// state events out to them.
pub struct ConnectionHub {
    /// Attached connections grouped by session.
    buckets: RwLock<HashMap<SessionId, Vec<Arc<ClientConnection>>>>,
}

impl ConnectionHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Attach a connection to its session's bucket and assign a seat.
    ///
    /// The first free seat (X before O) goes to the newcomer, so a
    /// reconnect after a disconnect reclaims the freed seat. A third or
    /// later connection gets no seat. Returns the bucket size after the
    /// attach and the assigned seat.
    pub fn attach(&self, conn: Arc<ClientConnection>) -> (usize, Option<Mark>) {
        let mut buckets = self.buckets.write();
        let bucket = buckets.entry(conn.session_id().clone()).or_default();
        let seat = SEATS
            .into_iter()
            .find(|m| !bucket.iter().any(|c| c.seat() == Some(*m)));
        conn.set_seat(seat);
        bucket.push(conn);
        (bucket.len(), seat)
    }

    /// Detach a connection from its session's bucket.
    ///
    /// Returns `false` if the connection was not attached, so teardown
    /// paths that race each other run their cleanup exactly once.
    pub fn detach(&self, session_id: &SessionId, conn_id: &ConnectionId) -> bool {
        let mut buckets = self.buckets.write();
        let Some(bucket) = buckets.get_mut(session_id) else {
            return false;
        };
        let before = bucket.len();
        bucket.retain(|c| &c.id != conn_id);
        let removed = bucket.len() < before;
        if bucket.is_empty() {
            let _ = buckets.remove(session_id);
        }
        removed
    }

    /// Broadcast an event to every connection attached to `session_id`.
    ///
    /// Delivery is independent per connection: a full queue drops the
    /// message for that connection only. A closed queue, or one still
    /// full after [`MAX_SEND_DROPS`] failed enqueues, marks the
    /// connection failed and detaches it after the fan-out. Returns the
    /// number of successful enqueues.
    pub fn broadcast(&self, session_id: &SessionId, event: &ServerEvent) -> usize {
        let payload = Arc::new(event.to_json());
        let mut delivered = 0;
        let mut dead: Vec<ConnectionId> = Vec::new();
        {
            let buckets = self.buckets.read();
            let Some(bucket) = buckets.get(session_id) else {
                return 0;
            };
            debug!(
                session_id = %session_id,
                recipients = bucket.len(),
                "broadcast state to session"
            );
            for conn in bucket {
                if conn.send(Arc::clone(&payload)) {
                    delivered += 1;
                    continue;
                }
                counter!(WS_BROADCAST_DROPS_TOTAL).increment(1);
                if conn.is_closed() || conn.drop_count() >= MAX_SEND_DROPS {
                    dead.push(conn.id);
                } else {
                    warn!(
                        conn_id = %conn.id,
                        session_id = %session_id,
                        "send queue full, dropping broadcast"
                    );
                }
            }
        }
        for conn_id in &dead {
            let _ = self.detach(session_id, conn_id);
            warn!(
                conn_id = %conn_id,
                session_id = %session_id,
                "detached failed connection during broadcast"
            );
        }
        delivered
    }

    /// Number of connections attached to `session_id`.
    #[must_use]
    pub fn connections_in(&self, session_id: &SessionId) -> usize {
        self.buckets
            .read()
            .get(session_id)
            .map_or(0, std::vec::Vec::len)
    }

    /// Total attached connections across all sessions.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.buckets.read().values().map(std::vec::Vec::len).sum()
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
