//! # parlor-rules
//!
//! Rule engines for parlor game sessions: the [`RuleEngine`] trait the
//! session core programs against, and the one shipped implementation,
//! [`TicTacToe`].
//!
//! Engines are pure — (state, move) in, (new state | rejection) out — so
//! the session layer owns all synchronization and broadcast concerns.

#![deny(unsafe_code)]

pub mod engine;
pub mod tictactoe;

pub use engine::{GameState, Outcome, RuleEngine};
pub use tictactoe::TicTacToe;
