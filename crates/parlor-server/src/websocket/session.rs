//! WebSocket session lifecycle — handles a single connected client from
//! upgrade through disconnect.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, trace, warn};

use parlor_core::{ConnectionId, Inbound, MoveRejection, ServerEvent, decode_inbound};
use parlor_session::{MovePolicy, Session};

use crate::metrics::{
    MOVES_APPLIED_TOTAL, MOVES_REJECTED_TOTAL, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::server::AppState;

use super::connection::ClientConnection;
use super::heartbeat::{HeartbeatResult, run_heartbeat};

/// Why a connection's loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The client sent a close frame or the stream ended.
    ClientClosed,
    /// The underlying transport errored.
    TransportError,
    /// The heartbeat gave up on the client.
    HeartbeatTimeout,
    /// Undecodable input under the compat policy.
    MalformedInput,
    /// The outbound writer task ended first.
    WriterGone,
    /// Server shutdown.
    Shutdown,
}

impl CloseReason {
    /// Short label for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::TransportError => "transport_error",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::MalformedInput => "malformed_input",
            Self::WriterGone => "writer_gone",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Attaches to the session's hub bucket (seat assignment); when the
///    attach fills the second slot, broadcasts the `start` event
/// 2. Dispatches inbound text frames as move submissions
/// 3. Forwards outbound broadcasts via the send channel
/// 4. Sends periodic Ping frames and disconnects unresponsive clients
/// 5. Detaches exactly once on the way out
#[instrument(skip_all, fields(session_id = %session.id()))]
pub async fn run_ws_session(socket: WebSocket, session: Arc<Session>, state: AppState) {
    let policy = state.registry.policy();
    let (send_tx, mut send_rx) =
        mpsc::channel::<Arc<String>>(state.config.send_queue_capacity.max(1));
    let connection = Arc::new(ClientConnection::new(
        ConnectionId::new(),
        session.id().clone(),
        send_tx,
    ));

    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    // Attach under the table guard so the start broadcast cannot interleave
    // with a move committed by an already-attached peer.
    let (attached, seat) = {
        let table = session.table().await;
        let (attached, seat) = state.hub.attach(Arc::clone(&connection));
        if attached == 2 {
            let snap = table.snapshot();
            let _ = state.hub.broadcast(
                session.id(),
                &ServerEvent::Start {
                    board: snap.board,
                    turn: snap.turn,
                },
            );
        }
        (attached, seat)
    };
    session.touch();
    info!(conn_id = %connection.id, ?seat, attached, "client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Outbound writer: forwards enqueued broadcasts and sends periodic pings.
    // Holds only the connection id, so dropping the ClientConnection closes
    // the channel and ends this task.
    let ping_interval = state.config.heartbeat_interval();
    let writer_conn_id = connection.id;
    let mut outbound = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_interval);
        // Skip the immediate first tick
        let _ = ping.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping.tick() => {
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                    trace!(conn_id = %writer_conn_id, "sent ping");
                }
            }
        }
    });

    // The shutdown token doubles as the heartbeat cancel, so server
    // shutdown unblocks every connection loop.
    let heartbeat = run_heartbeat(
        Arc::clone(&connection),
        state.config.heartbeat_interval(),
        state.config.heartbeat_timeout(),
        state.shutdown.token(),
    );
    tokio::pin!(heartbeat);

    let close_reason = loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        connection.mark_alive();
                        if let Some(reason) =
                            handle_text(text.as_str(), &session, &connection, &state, policy).await
                        {
                            break reason;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => connection.mark_alive(),
                    // axum answers pings automatically
                    Some(Ok(Message::Ping(_))) => {}
                    Some(Ok(Message::Binary(_))) => match policy {
                        MovePolicy::Strict => {
                            let _ = connection.send_event(&ServerEvent::Error {
                                message: "binary frames are not supported".into(),
                            });
                        }
                        MovePolicy::Compat => break CloseReason::MalformedInput,
                    },
                    Some(Ok(Message::Close(_))) => break CloseReason::ClientClosed,
                    Some(Err(_)) => break CloseReason::TransportError,
                    None => break CloseReason::ClientClosed,
                }
            }
            result = &mut heartbeat => {
                match result {
                    HeartbeatResult::TimedOut => break CloseReason::HeartbeatTimeout,
                    HeartbeatResult::Cancelled => break CloseReason::Shutdown,
                }
            }
            _ = &mut outbound => break CloseReason::WriterGone,
        }
    };

    // Single teardown path: every exit above funnels through here, so the
    // hub detach happens exactly once per connection.
    outbound.abort();
    let detached = state.hub.detach(session.id(), &connection.id);
    if detached {
        session.touch();
    }
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    let drops = connection.drop_count();
    if drops > 0 {
        warn!(conn_id = %connection.id, drops, "connection closed with dropped messages");
    }
    info!(
        conn_id = %connection.id,
        reason = close_reason.as_str(),
        age_secs = connection.age().as_secs(),
        "client disconnected"
    );
}

/// Handle one inbound text frame.
///
/// Returns `Some(reason)` when the frame is fatal to the connection under
/// the active policy; `None` keeps the loop going. A committed move is
/// broadcast while the table guard is still held, which pins the fan-out
/// order to the commit order.
async fn handle_text(
    text: &str,
    session: &Arc<Session>,
    connection: &Arc<ClientConnection>,
    state: &AppState,
    policy: MovePolicy,
) -> Option<CloseReason> {
    match decode_inbound(text) {
        Ok(Inbound::Move { position, symbol }) => {
            let mut table = session.table().await;
            match table.submit_move(symbol, position, connection.seat()) {
                Ok(snap) => {
                    counter!(MOVES_APPLIED_TOTAL).increment(1);
                    let _ = state.hub.broadcast(
                        session.id(),
                        &ServerEvent::Update {
                            board: snap.board,
                            turn: snap.turn,
                            winner: snap.winner,
                        },
                    );
                    drop(table);
                    session.touch();
                    debug!(conn_id = %connection.id, position, symbol = %symbol, "move applied");
                    None
                }
                Err(rejection) => {
                    drop(table);
                    counter!(MOVES_REJECTED_TOTAL, "reason" => rejection_label(rejection))
                        .increment(1);
                    debug!(conn_id = %connection.id, position, %rejection, "move rejected");
                    match policy {
                        MovePolicy::Strict => {
                            let _ = connection
                                .send_event(&ServerEvent::Rejected { reason: rejection });
                            None
                        }
                        // Compat rejections are silent, except a position
                        // outside the board which is fatal to the connection.
                        MovePolicy::Compat => (rejection == MoveRejection::InvalidPosition)
                            .then_some(CloseReason::MalformedInput),
                    }
                }
            }
        }
        Ok(Inbound::Ignored) => None,
        Err(err) => match policy {
            MovePolicy::Strict => {
                warn!(conn_id = %connection.id, error = %err, "malformed frame");
                let _ = connection.send_event(&ServerEvent::Error {
                    message: err.to_string(),
                });
                None
            }
            MovePolicy::Compat => Some(CloseReason::MalformedInput),
        },
    }
}

fn rejection_label(rejection: MoveRejection) -> &'static str {
    match rejection {
        MoveRejection::GameOver => "game_over",
        MoveRejection::CellOccupied => "cell_occupied",
        MoveRejection::InvalidPosition => "invalid_position",
        MoveRejection::OutOfTurn => "out_of_turn",
        MoveRejection::WrongSymbol => "wrong_symbol",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    // Full socket lifecycles (upgrade, ping, close) are covered by
    // tests/integration.rs; these exercise the frame handler directly.

    use super::*;
    use std::time::Instant;

    use metrics_exporter_prometheus::PrometheusBuilder;
    use tokio::sync::mpsc::Receiver;

    use parlor_core::Mark;
    use parlor_rules::TicTacToe;
    use parlor_session::SessionRegistry;

    use crate::config::ServerConfig;
    use crate::shutdown::ShutdownCoordinator;
    use crate::websocket::hub::ConnectionHub;

    fn make_state(policy: MovePolicy) -> AppState {
        AppState {
            config: Arc::new(ServerConfig::default()),
            registry: Arc::new(SessionRegistry::new(Arc::new(TicTacToe), policy)),
            hub: Arc::new(ConnectionHub::new()),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            metrics: PrometheusBuilder::new().build_recorder().handle(),
            start_time: Instant::now(),
        }
    }

    fn attach_conn(
        state: &AppState,
        session: &Arc<Session>,
    ) -> (Arc<ClientConnection>, Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(32);
        let conn = Arc::new(ClientConnection::new(
            ConnectionId::new(),
            session.id().clone(),
            tx,
        ));
        let _ = state.hub.attach(Arc::clone(&conn));
        (conn, rx)
    }

    fn recv_json(rx: &mut Receiver<Arc<String>>) -> serde_json::Value {
        let msg = rx.try_recv().expect("expected a queued frame");
        serde_json::from_str(&msg).unwrap()
    }

    #[tokio::test]
    async fn move_broadcasts_update_to_whole_bucket() {
        let state = make_state(MovePolicy::Strict);
        let session = state.registry.create("Alice").unwrap();
        let (x_conn, mut x_rx) = attach_conn(&state, &session);
        let (_o_conn, mut o_rx) = attach_conn(&state, &session);

        let frame = r#"{"action":"move","position":0,"symbol":"X"}"#;
        let out = handle_text(frame, &session, &x_conn, &state, MovePolicy::Strict).await;
        assert_eq!(out, None);

        for rx in [&mut x_rx, &mut o_rx] {
            let update = recv_json(rx);
            assert_eq!(update["action"], "update");
            assert_eq!(update["board"][0], "X");
            assert_eq!(update["turn"], "O");
            assert!(update["winner"].is_null());
        }
    }

    #[tokio::test]
    async fn winning_move_carries_winner() {
        let state = make_state(MovePolicy::Compat);
        let session = state.registry.create("Alice").unwrap();
        let (conn, mut rx) = attach_conn(&state, &session);

        for frame in [
            r#"{"action":"move","position":0,"symbol":"X"}"#,
            r#"{"action":"move","position":3,"symbol":"O"}"#,
            r#"{"action":"move","position":1,"symbol":"X"}"#,
            r#"{"action":"move","position":4,"symbol":"O"}"#,
            r#"{"action":"move","position":2,"symbol":"X"}"#,
        ] {
            let out = handle_text(frame, &session, &conn, &state, MovePolicy::Compat).await;
            assert_eq!(out, None);
        }

        let mut last = recv_json(&mut rx);
        for _ in 0..4 {
            last = recv_json(&mut rx);
        }
        assert_eq!(last["winner"], "X");
        // The turn indicator flips even on the winning move.
        assert_eq!(last["turn"], "O");
    }

    #[tokio::test]
    async fn strict_rejection_is_private_to_sender() {
        let state = make_state(MovePolicy::Strict);
        let session = state.registry.create("Alice").unwrap();
        let (_x_conn, mut x_rx) = attach_conn(&state, &session);
        let (o_conn, mut o_rx) = attach_conn(&state, &session);

        // The O-seat connection claims X.
        let frame = r#"{"action":"move","position":0,"symbol":"X"}"#;
        let out = handle_text(frame, &session, &o_conn, &state, MovePolicy::Strict).await;
        assert_eq!(out, None);

        let rejected = recv_json(&mut o_rx);
        assert_eq!(rejected["action"], "rejected");
        assert_eq!(rejected["reason"], "wrong_symbol");
        assert!(x_rx.try_recv().is_err(), "peer must not see the rejection");
    }

    #[tokio::test]
    async fn strict_out_of_turn_rejected_after_seat_check() {
        let state = make_state(MovePolicy::Strict);
        let session = state.registry.create("Alice").unwrap();
        let (_x_conn, _x_rx) = attach_conn(&state, &session);
        let (o_conn, mut o_rx) = attach_conn(&state, &session);

        // Correct seat, but X moves first.
        let frame = r#"{"action":"move","position":0,"symbol":"O"}"#;
        let out = handle_text(frame, &session, &o_conn, &state, MovePolicy::Strict).await;
        assert_eq!(out, None);
        assert_eq!(recv_json(&mut o_rx)["reason"], "out_of_turn");
    }

    #[tokio::test]
    async fn compat_rejection_is_silent() {
        let state = make_state(MovePolicy::Compat);
        let session = state.registry.create("Alice").unwrap();
        let (conn, mut rx) = attach_conn(&state, &session);

        let first = r#"{"action":"move","position":4,"symbol":"X"}"#;
        assert_eq!(
            handle_text(first, &session, &conn, &state, MovePolicy::Compat).await,
            None
        );
        let _ = recv_json(&mut rx);

        // Same cell again: dropped without any feedback.
        let occupied = r#"{"action":"move","position":4,"symbol":"O"}"#;
        assert_eq!(
            handle_text(occupied, &session, &conn, &state, MovePolicy::Compat).await,
            None
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn compat_out_of_board_position_is_fatal() {
        let state = make_state(MovePolicy::Compat);
        let session = state.registry.create("Alice").unwrap();
        let (conn, _rx) = attach_conn(&state, &session);

        let frame = r#"{"action":"move","position":9,"symbol":"X"}"#;
        let out = handle_text(frame, &session, &conn, &state, MovePolicy::Compat).await;
        assert_eq!(out, Some(CloseReason::MalformedInput));
    }

    #[tokio::test]
    async fn compat_malformed_json_is_fatal() {
        let state = make_state(MovePolicy::Compat);
        let session = state.registry.create("Alice").unwrap();
        let (conn, _rx) = attach_conn(&state, &session);

        let out = handle_text("not json", &session, &conn, &state, MovePolicy::Compat).await;
        assert_eq!(out, Some(CloseReason::MalformedInput));
    }

    #[tokio::test]
    async fn strict_malformed_json_reports_and_recovers() {
        let state = make_state(MovePolicy::Strict);
        let session = state.registry.create("Alice").unwrap();
        let (conn, mut rx) = attach_conn(&state, &session);

        let out = handle_text("not json", &session, &conn, &state, MovePolicy::Strict).await;
        assert_eq!(out, None);
        let error = recv_json(&mut rx);
        assert_eq!(error["action"], "error");
        assert!(error["message"].as_str().unwrap().contains("invalid JSON"));
    }

    #[tokio::test]
    async fn non_move_actions_are_skipped() {
        let state = make_state(MovePolicy::Compat);
        let session = state.registry.create("Alice").unwrap();
        let (conn, mut rx) = attach_conn(&state, &session);

        let frame = r#"{"action":"chat","text":"hello"}"#;
        let out = handle_text(frame, &session, &conn, &state, MovePolicy::Compat).await;
        assert_eq!(out, None);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn compat_accepts_moves_from_seatless_connections() {
        let state = make_state(MovePolicy::Compat);
        let session = state.registry.create("Alice").unwrap();
        let (_a, _a_rx) = attach_conn(&state, &session);
        let (_b, _b_rx) = attach_conn(&state, &session);
        let (spectator, mut spectator_rx) = attach_conn(&state, &session);
        assert_eq!(spectator.seat(), None);

        let frame = r#"{"action":"move","position":0,"symbol":"O"}"#;
        let out = handle_text(frame, &session, &spectator, &state, MovePolicy::Compat).await;
        assert_eq!(out, None);
        assert_eq!(recv_json(&mut spectator_rx)["board"][0], "O");
    }

    #[tokio::test]
    async fn strict_rejects_moves_from_seatless_connections() {
        let state = make_state(MovePolicy::Strict);
        let session = state.registry.create("Alice").unwrap();
        let (_a, _a_rx) = attach_conn(&state, &session);
        let (_b, _b_rx) = attach_conn(&state, &session);
        let (spectator, mut spectator_rx) = attach_conn(&state, &session);

        let frame = r#"{"action":"move","position":0,"symbol":"X"}"#;
        let out = handle_text(frame, &session, &spectator, &state, MovePolicy::Strict).await;
        assert_eq!(out, None);
        assert_eq!(recv_json(&mut spectator_rx)["reason"], "wrong_symbol");
    }

    #[test]
    fn close_reason_labels() {
        assert_eq!(CloseReason::ClientClosed.as_str(), "client_closed");
        assert_eq!(CloseReason::HeartbeatTimeout.as_str(), "heartbeat_timeout");
        assert_eq!(CloseReason::Shutdown.as_str(), "shutdown");
    }

    #[test]
    fn rejection_labels_match_wire_reasons() {
        for (rejection, label) in [
            (MoveRejection::GameOver, "game_over"),
            (MoveRejection::CellOccupied, "cell_occupied"),
            (MoveRejection::InvalidPosition, "invalid_position"),
            (MoveRejection::OutOfTurn, "out_of_turn"),
            (MoveRejection::WrongSymbol, "wrong_symbol"),
        ] {
            assert_eq!(rejection_label(rejection), label);
            assert_eq!(
                serde_json::to_value(rejection).unwrap(),
                serde_json::Value::String(label.into())
            );
        }
    }

    #[tokio::test]
    async fn seat_order_follows_attach_order() {
        let state = make_state(MovePolicy::Strict);
        let session = state.registry.create("Alice").unwrap();
        let (first, _rx1) = attach_conn(&state, &session);
        let (second, _rx2) = attach_conn(&state, &session);
        assert_eq!(first.seat(), Some(Mark::X));
        assert_eq!(second.seat(), Some(Mark::O));
    }
}
