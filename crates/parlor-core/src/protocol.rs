//! Wire protocol: server events and inbound decoding.
//!
//! All frames are JSON text tagged by an `action` field. Outbound events
//! are [`ServerEvent`]; inbound frames decode through [`decode_inbound`],
//! which distinguishes a well-formed move, a well-formed non-move
//! (ignored), and a malformed frame.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Mark};
use crate::errors::{DecodeError, MoveRejection};

/// A server-to-client event.
///
/// `Start` and `Update` broadcast to the whole session; `Rejected` and
/// `Error` are sender-private and emitted only under the strict policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ServerEvent {
    /// Play begins (or resumes): the current board and whose turn it is.
    Start {
        /// Current board snapshot.
        board: Board,
        /// Mark to move next.
        turn: Mark,
    },
    /// A move was applied.
    Update {
        /// Board after the move.
        board: Board,
        /// Mark to move next (toggled even on a winning move).
        turn: Mark,
        /// Recorded winner, `null` while the game is open.
        winner: Option<Mark>,
    },
    /// The sender's move was rejected (strict mode only).
    Rejected {
        /// Why the move was refused.
        reason: MoveRejection,
    },
    /// The sender's frame could not be decoded (strict mode only).
    Error {
        /// Human-readable decode failure.
        message: String,
    },
}

impl ServerEvent {
    /// Serialize to the JSON text frame.
    ///
    /// Infallible for these shapes; kept as a method so call sites read as
    /// intent rather than `serde_json` plumbing.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

/// A decoded inbound frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A move submission.
    Move {
        /// Target cell index, 0–8 row-major (range-checked by the engine).
        position: usize,
        /// The mark the sender claims to play.
        symbol: Mark,
    },
    /// Valid JSON whose `action` is not `move`; silently skipped.
    Ignored,
}

#[derive(Debug, Deserialize)]
struct MoveFrame {
    position: usize,
    symbol: Mark,
}

/// Decode one inbound text frame.
///
/// The access order decides what counts as malformed, which compat mode
/// treats as connection-fatal: not JSON → error; JSON without `action` →
/// error; `action` other than `"move"` → ignored; a `move` whose
/// `position`/`symbol` are missing or ill-typed → error.
pub fn decode_inbound(text: &str) -> Result<Inbound, DecodeError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(DecodeError::Json)?;
    let Some(action) = value.get("action") else {
        return Err(DecodeError::MissingAction);
    };
    if action != "move" {
        return Ok(Inbound::Ignored);
    }
    let frame: MoveFrame = serde_json::from_value(value).map_err(DecodeError::Move)?;
    Ok(Inbound::Move {
        position: frame.position,
        symbol: frame.symbol,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
