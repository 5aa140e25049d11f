//! Per-client connection state shared between the socket task, the hub,
//! and the heartbeat.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use parlor_core::{ConnectionId, Mark, ServerEvent, SessionId};

/// One connected WebSocket client.
///
/// Bound to a single session for its whole life; the binding is fixed at
/// upgrade time. The seat is assigned by the hub at attach and stays
/// `None` for connections beyond the first two.
pub struct ClientConnection {
    /// Unique id, for logs and hub detach.
    pub id: ConnectionId,
    session_id: SessionId,
    seat: Mutex<Option<Mark>>,
    outbound: mpsc::Sender<Arc<String>>,
    opened_at: Instant,
    alive: AtomicBool,
    dropped: AtomicU64,
}

impl ClientConnection {
    /// A connection bound to `session_id`, with `outbound` feeding the
    /// socket writer task.
    pub fn new(
        id: ConnectionId,
        session_id: SessionId,
        outbound: mpsc::Sender<Arc<String>>,
    ) -> Self {
        Self {
            id,
            session_id,
            seat: Mutex::new(None),
            outbound,
            opened_at: Instant::now(),
            alive: AtomicBool::new(true),
            dropped: AtomicU64::new(0),
        }
    }

    /// The session this connection is bound to.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// The seat held by this connection, if any.
    pub fn seat(&self) -> Option<Mark> {
        *self.seat.lock()
    }

    /// Assign or clear the seat. Only the hub calls this, under its
    /// bucket lock.
    pub fn set_seat(&self, seat: Option<Mark>) {
        *self.seat.lock() = seat;
    }

    /// Queue a frame for the writer task.
    ///
    /// `false` means the frame was not queued: either the queue is full
    /// or the writer is gone. The drop counter increments either way.
    pub fn send(&self, frame: Arc<String>) -> bool {
        if self.outbound.try_send(frame).is_ok() {
            return true;
        }
        let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
        false
    }

    /// Serialize an event and queue it for this client only.
    pub fn send_event(&self, event: &ServerEvent) -> bool {
        self.send(Arc::new(event.to_json()))
    }

    /// Whether the writer task has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Frames never queued because the queue was full or closed.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Note a sign of life (pong or any inbound traffic).
    pub fn mark_alive(&self) {
        self.alive.store(true, Ordering::Relaxed);
    }

    /// Take the alive flag: reports whether anything marked the
    /// connection alive since the last take, clearing it either way.
    pub fn check_alive(&self) -> bool {
        self.alive.swap(false, Ordering::Relaxed)
    }

    /// How long this connection has been open.
    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_core::Board;

    fn make_connection() -> (ClientConnection, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = ClientConnection::new(ConnectionId::new(), SessionId::from("abc123"), tx);
        (conn, rx)
    }

    #[test]
    fn fresh_connection_state() {
        let (conn, _rx) = make_connection();
        assert_eq!(conn.session_id().as_str(), "abc123");
        assert!(conn.seat().is_none());
        assert!(!conn.is_closed());
        assert_eq!(conn.drop_count(), 0);
    }

    #[tokio::test]
    async fn queued_frames_arrive_in_order() {
        let (conn, mut rx) = make_connection();
        for i in 0..5 {
            assert!(conn.send(Arc::new(format!("frame_{i}"))));
        }
        for i in 0..5 {
            let frame = rx.recv().await.unwrap();
            assert_eq!(&*frame, &format!("frame_{i}"));
        }
    }

    #[tokio::test]
    async fn full_queue_counts_a_drop() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = ClientConnection::new(ConnectionId::new(), SessionId::from("abc123"), tx);
        assert!(conn.send(Arc::new("first".into())));
        assert!(!conn.send(Arc::new("second".into())));
        assert_eq!(conn.drop_count(), 1);
        // Full is not closed.
        assert!(!conn.is_closed());
    }

    #[tokio::test]
    async fn gone_writer_counts_a_drop_and_reads_closed() {
        let (conn, rx) = make_connection();
        drop(rx);
        assert!(!conn.send(Arc::new("frame".into())));
        assert!(conn.is_closed());
        assert_eq!(conn.drop_count(), 1);
    }

    #[test]
    fn seat_can_be_assigned_and_cleared() {
        let (conn, _rx) = make_connection();
        conn.set_seat(Some(Mark::O));
        assert_eq!(conn.seat(), Some(Mark::O));
        conn.set_seat(None);
        assert_eq!(conn.seat(), None);
    }

    #[test]
    fn check_alive_consumes_the_flag() {
        let (conn, _rx) = make_connection();
        // Born alive, consumed by the first check.
        assert!(conn.check_alive());
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
    }

    #[tokio::test]
    async fn send_event_writes_wire_json() {
        let (conn, mut rx) = make_connection();
        let event = ServerEvent::Start {
            board: Board::new(),
            turn: Mark::X,
        };
        assert!(conn.send_event(&event));
        let frame = rx.recv().await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed["action"], "start");
        assert_eq!(parsed["turn"], "X");
    }

    #[test]
    fn age_grows() {
        let (conn, _rx) = make_connection();
        let before = conn.age();
        std::thread::sleep(Duration::from_millis(10));
        assert!(conn.age() > before);
    }

    #[test]
    fn ids_are_unique_per_connection() {
        let (a, _rx_a) = make_connection();
        let (b, _rx_b) = make_connection();
        assert_ne!(a.id, b.id);
    }
}
