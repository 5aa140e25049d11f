//! Shared error vocabulary.
//!
//! Library crates return these enums; the server maps them onto the wire
//! (HTTP error bodies use the `Display` text, WebSocket `rejected` events
//! use the serde rename). The binary wraps everything in `anyhow` at the
//! composition root.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a move submission was rejected.
///
/// `GameOver` and `CellOccupied` come from the rule engine in both modes
/// (checked winner first, then occupancy).
/// `OutOfTurn` and `WrongSymbol` are raised only under the strict move
/// policy. Serialized snake_case as the `reason` of a `rejected` event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveRejection {
    /// A winner is already recorded.
    #[error("the game is already over")]
    GameOver,
    /// The target cell holds a mark.
    #[error("the cell is already occupied")]
    CellOccupied,
    /// The position is outside 0–8.
    #[error("the position is outside the board")]
    InvalidPosition,
    /// It is the other mark's turn (strict mode only).
    #[error("it is not this mark's turn")]
    OutOfTurn,
    /// The claimed mark does not match the submitting seat (strict mode only).
    #[error("the claimed mark does not match this connection's seat")]
    WrongSymbol,
}

/// Failure to join a session.
///
/// The `Display` strings are the wire `error` bodies of
/// `POST /join_session/{id}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum JoinError {
    /// No session exists under the requested id.
    #[error("Session not found.")]
    NotFound,
    /// The second slot is already filled.
    #[error("Session already full.")]
    AlreadyFull,
}

/// Failure to create a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CreateError {
    /// Id generation kept colliding with live sessions.
    #[error("could not allocate a fresh session id")]
    IdExhausted,
}

/// Failure to decode an inbound WebSocket text frame.
///
/// The variants follow the decoder's field-access order: the frame must
/// be JSON, must carry an `action` key, and a `move` action must carry a
/// well-typed `position` and `symbol`. Compat mode treats any of these as
/// fatal to the connection; strict mode reports and recovers.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),
    /// The frame has no `action` field.
    #[error("message has no `action` field")]
    MissingAction,
    /// A `move` action with a missing or ill-typed field.
    #[error("malformed move payload: {0}")]
    Move(#[source] serde_json::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
