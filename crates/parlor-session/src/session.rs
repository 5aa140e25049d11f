//! One live game session.
//!
//! All game mutation goes through the [`GameTable`] behind the session's
//! async mutex, so moves are totally ordered per session. The guard is
//! public: the protocol handler keeps it across apply **and** broadcast
//! enqueue, which is what makes per-session broadcast order equal move
//! order (see the hub's docs).

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use parlor_core::{Board, JoinError, Mark, MoveRejection, SessionId};
use parlor_rules::{GameState, Outcome, RuleEngine};

/// How strictly move submissions are policed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovePolicy {
    /// Permissive: any connection may submit any mark at any time,
    /// rejections are silent, malformed input is fatal to the
    /// connection.
    Compat,
    /// Enforce seat ownership and turn order; rejected moves and malformed
    /// frames get sender-private notices and the connection survives.
    #[default]
    Strict,
}

/// Board, turn, and winner at one committed point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Board after the last accepted move.
    pub board: Board,
    /// Mark to move next.
    pub turn: Mark,
    /// Recorded winner, if any.
    pub winner: Option<Mark>,
}

/// The serialized mutable core of a session.
///
/// Only reachable through [`Session::table`], so at most one mutation is
/// in flight per session.
pub struct GameTable {
    engine: Arc<dyn RuleEngine>,
    policy: MovePolicy,
    state: GameState,
    turn: Mark,
    creator: String,
    joiner: Option<String>,
}

impl GameTable {
    /// Submit one move.
    ///
    /// Under [`MovePolicy::Strict`] the claimed mark must match the
    /// sender's seat and it must be that mark's turn; both checks run
    /// before engine legality. On success the turn indicator toggles
    /// unconditionally, including on a winning move, so the final update
    /// carries the flipped turn.
    pub fn submit_move(
        &mut self,
        claimed: Mark,
        position: usize,
        seat: Option<Mark>,
    ) -> Result<Snapshot, MoveRejection> {
        if self.policy == MovePolicy::Strict {
            if seat != Some(claimed) {
                return Err(MoveRejection::WrongSymbol);
            }
            if claimed != self.turn {
                return Err(MoveRejection::OutOfTurn);
            }
        }
        self.state = self.engine.apply(&self.state, position, claimed)?;
        self.turn = self.turn.other();
        Ok(self.snapshot())
    }

    /// Current board, turn, and winner.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            board: *self.state.board(),
            turn: self.turn,
            winner: self.state.winner(),
        }
    }

    /// Terminal verdict, or `None` while play continues.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.engine.outcome(&self.state)
    }

    /// The creator's display name (slot X).
    #[must_use]
    pub fn creator(&self) -> &str {
        &self.creator
    }

    /// The joiner's display name (slot O), once filled.
    #[must_use]
    pub fn joiner(&self) -> Option<&str> {
        self.joiner.as_deref()
    }

    /// True once both slots are filled.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.joiner.is_some()
    }
}

/// One in-progress game, identified by a short shareable token.
pub struct Session {
    id: SessionId,
    created_at: Instant,
    last_activity: parking_lot::Mutex<Instant>,
    table: Mutex<GameTable>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session with slot X filled by `creator` and an initial
    /// state from the engine.
    #[must_use]
    pub fn new(
        id: SessionId,
        engine: Arc<dyn RuleEngine>,
        policy: MovePolicy,
        creator: &str,
    ) -> Self {
        let state = engine.initial_state();
        Self {
            id,
            created_at: Instant::now(),
            last_activity: parking_lot::Mutex::new(Instant::now()),
            table: Mutex::new(GameTable {
                engine,
                policy,
                state,
                turn: Mark::X,
                creator: creator.to_owned(),
                joiner: None,
            }),
        }
    }

    /// The session's shareable id.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Fill slot O. Fails with [`JoinError::AlreadyFull`] if taken; a
    /// filled slot is never reassigned.
    pub async fn join(&self, name: &str) -> Result<(), JoinError> {
        let mut table = self.table.lock().await;
        if table.joiner.is_some() {
            return Err(JoinError::AlreadyFull);
        }
        table.joiner = Some(name.to_owned());
        drop(table);
        self.touch();
        Ok(())
    }

    /// Lock the game table for a serialized mutation or read.
    pub async fn table(&self) -> MutexGuard<'_, GameTable> {
        self.table.lock().await
    }

    /// Record activity (join, attach, detach) for idle tracking.
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last recorded activity.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Time since the session was created.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
