//! In-memory registry of live sessions.
//!
//! Sessions are keyed by their six-character shareable id. The map is
//! sharded, so lookups on the hot path never serialize behind each other.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, instrument};

use parlor_core::{CreateError, JoinError, SessionId};
use parlor_rules::RuleEngine;

use crate::session::{MovePolicy, Session};

/// How many fresh ids to try before giving up on a create.
///
/// Ids are six hex characters, so a collision is already a sign the
/// registry is absurdly full; eight misses in a row means stop.
const MAX_ID_ATTEMPTS: usize = 8;

/// Owns every live [`Session`] and vends shared handles to them.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
    engine: Arc<dyn RuleEngine>,
    policy: MovePolicy,
}

impl SessionRegistry {
    /// A registry that creates sessions with `engine` and `policy`.
    #[must_use]
    pub fn new(engine: Arc<dyn RuleEngine>, policy: MovePolicy) -> Self {
        Self {
            sessions: DashMap::new(),
            engine,
            policy,
        }
    }

    /// The policy every session in this registry runs under.
    #[must_use]
    pub fn policy(&self) -> MovePolicy {
        self.policy
    }

    /// Create a session with a freshly generated id, `creator` in slot X.
    ///
    /// Generated ids are re-rolled on collision; the id is only published
    /// once the session is fully built, so a concurrent create can never
    /// observe a half-made entry.
    #[instrument(skip(self))]
    pub fn create(&self, creator: &str) -> Result<Arc<Session>, CreateError> {
        for attempt in 0..MAX_ID_ATTEMPTS {
            let id = SessionId::generate();
            match self.sessions.entry(id) {
                Entry::Occupied(taken) => {
                    debug!(id = %taken.key(), attempt, "short id collision, regenerating");
                }
                Entry::Vacant(slot) => {
                    let id = slot.key().clone();
                    let session = Arc::new(Session::new(
                        id.clone(),
                        Arc::clone(&self.engine),
                        self.policy,
                        creator,
                    ));
                    let _ = slot.insert(Arc::clone(&session));
                    debug!(session_id = %id, creator, "session created");
                    return Ok(session);
                }
            }
        }
        Err(CreateError::IdExhausted)
    }

    /// Look up a session by id.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Fill the O slot of the session with `id`.
    #[instrument(skip(self))]
    pub async fn join(&self, id: &SessionId, name: &str) -> Result<Arc<Session>, JoinError> {
        let session = self.get(id).ok_or(JoinError::NotFound)?;
        session.join(name).await?;
        debug!(session_id = %id, name, "player joined");
        Ok(session)
    }

    /// Drop the session with `id`. Returns false if it was not present.
    #[instrument(skip(self))]
    pub fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            debug!(session_id = %id, "session removed");
        }
        removed
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no sessions are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Snapshot of every live session, for periodic sweeps.
    #[must_use]
    pub fn sessions(&self) -> Vec<(SessionId, Arc<Session>)> {
        self.sessions
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
