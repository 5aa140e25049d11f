//! The rule-engine seam between game logic and session plumbing.

use parlor_core::{Board, Mark, MoveRejection};

/// Complete game state as a rule engine sees it.
///
/// Owned exclusively by a session and mutated only by replacing it with
/// the state an engine's [`RuleEngine::apply`] returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    winner: Option<Mark>,
}

impl GameState {
    /// Build a state from parts (for engines and tests).
    #[must_use]
    pub fn new(board: Board, winner: Option<Mark>) -> Self {
        Self { board, winner }
    }

    /// The board.
    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The recorded winner, if any.
    #[must_use]
    pub fn winner(&self) -> Option<Mark> {
        self.winner
    }
}

/// How a finished game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// One mark completed a winning configuration.
    Winner(Mark),
    /// The board filled with no winner.
    Draw,
}

/// Move legality and terminal-state evaluation for one game type.
///
/// Implementations must be pure and deterministic: `apply` never touches
/// the input state and has no side effects beyond the returned successor.
pub trait RuleEngine: Send + Sync {
    /// The state a fresh session starts from.
    fn initial_state(&self) -> GameState;

    /// Validate one move and produce the successor state.
    ///
    /// On rejection the caller keeps its current state; the error says why.
    fn apply(
        &self,
        state: &GameState,
        position: usize,
        mark: Mark,
    ) -> Result<GameState, MoveRejection>;

    /// Terminal verdict for `state`, or `None` while play continues.
    fn outcome(&self, state: &GameState) -> Option<Outcome>;
}
