//! # parlor-core
//!
//! Foundation types for the parlor session server — the shared vocabulary
//! every other parlor crate depends on:
//!
//! - **Branded IDs**: [`SessionId`] (short shareable token) and
//!   [`ConnectionId`] as newtypes for type safety
//! - **Board types**: [`Mark`], [`Cell`], [`Board`] with the wire encoding
//!   (each cell is `""`, `"X"`, or `"O"`)
//! - **Wire protocol**: [`ServerEvent`] plus inbound decoding via
//!   [`decode_inbound`]
//! - **Errors**: rejection and join/create error enums via `thiserror`

#![deny(unsafe_code)]

pub mod board;
pub mod errors;
pub mod ids;
pub mod protocol;

pub use board::{BOARD_CELLS, Board, Cell, Mark};
pub use errors::{CreateError, DecodeError, JoinError, MoveRejection};
pub use ids::{ConnectionId, SESSION_ID_LEN, SessionId};
pub use protocol::{Inbound, ServerEvent, decode_inbound};
