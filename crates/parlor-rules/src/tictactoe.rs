//! Classic 3x3 tic-tac-toe rules.

use parlor_core::{Board, Mark, MoveRejection};

use crate::engine::{GameState, Outcome, RuleEngine};

/// The eight winning triples, evaluated in this order: rows, columns,
/// diagonals. The scan stops at the first complete triple.
const WINNING_TRIPLES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Tic-tac-toe rule engine.
///
/// Check order: an already-decided game rejects before the position is
/// even looked at, then occupancy, then the mark is placed and the
/// winner scan runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct TicTacToe;

impl RuleEngine for TicTacToe {
    fn initial_state(&self) -> GameState {
        GameState::default()
    }

    fn apply(
        &self,
        state: &GameState,
        position: usize,
        mark: Mark,
    ) -> Result<GameState, MoveRejection> {
        if state.winner().is_some() {
            return Err(MoveRejection::GameOver);
        }
        let Some(cell) = state.board().cell(position) else {
            return Err(MoveRejection::InvalidPosition);
        };
        if !cell.is_empty() {
            return Err(MoveRejection::CellOccupied);
        }

        let mut board = *state.board();
        let _ = board.set(position, mark);
        Ok(GameState::new(board, find_winner(&board)))
    }

    fn outcome(&self, state: &GameState) -> Option<Outcome> {
        if let Some(mark) = state.winner() {
            return Some(Outcome::Winner(mark));
        }
        state.board().is_full().then_some(Outcome::Draw)
    }
}

/// The mark owning the first complete triple, in evaluation order.
fn find_winner(board: &Board) -> Option<Mark> {
    WINNING_TRIPLES.iter().find_map(|&[a, b, c]| {
        let mark = board.cell(a)?.mark()?;
        (board.cell(b)?.mark() == Some(mark) && board.cell(c)?.mark() == Some(mark))
            .then_some(mark)
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
