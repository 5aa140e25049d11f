//! Typed identifiers shared across the workspace.
//!
//! Session and connection identifiers are distinct newtypes, so a
//! connection ID can never be passed where a session ID is expected.
//!
//! [`SessionId`] is the short human-shareable token players exchange: the
//! first six characters of a random (v4) UUID, kept as a string because it
//! travels in URLs and JSON. [`ConnectionId`] is a full UUID v7
//! (time-ordered), useful when scanning logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of the shareable session token.
pub const SESSION_ID_LEN: usize = 6;

/// Short human-shareable session identifier.
///
/// Generated from a random UUID truncated to [`SESSION_ID_LEN`] hex
/// characters. Uniqueness within a process is enforced by the registry at
/// insertion time, not by the generator.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh short token.
    #[must_use]
    pub fn generate() -> Self {
        let mut token = Uuid::new_v4().simple().to_string();
        token.truncate(SESSION_ID_LEN);
        Self(token)
    }

    /// Create from an existing string value.
    #[must_use]
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume self and return the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::generate()
    }
}

impl std::ops::Deref for SessionId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Unique identifier for one WebSocket connection.
///
/// A full UUID v7, so connection ids sort by creation time when grepping
/// logs. Never leaves the server except in log lines, which is why the
/// type is `Copy` and carries no string conversions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// A fresh time-ordered id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
