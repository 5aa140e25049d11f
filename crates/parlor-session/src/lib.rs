//! # parlor-session
//!
//! Game sessions and the process-wide registry.
//!
//! A [`Session`] owns one game's state behind an async mutex: the two
//! participant slots, the board (via the rule engine), and the current-turn
//! indicator. The [`SessionRegistry`] maps short shareable ids to live
//! sessions and is safe under concurrent access from many connection tasks.

#![deny(unsafe_code)]

pub mod registry;
pub mod session;

pub use registry::SessionRegistry;
pub use session::{GameTable, MovePolicy, Session, Snapshot};
