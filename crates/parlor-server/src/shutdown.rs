//! Coordinated shutdown for the server's long-running tasks.
//!
//! One [`CancellationToken`] fans out to the accept loop, the expiry
//! sweeper, and every connection's heartbeat. Cancelling it starts the
//! shutdown; [`ShutdownCoordinator::drain`] then bounds how long the
//! server waits for those tasks to notice.

use std::time::Duration;

use futures::future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long [`crate::server::ParlorServer::listen`] waits for background
/// tasks after the accept loop stops.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the root cancellation token every server task watches.
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// A coordinator whose token has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A token handle for a task that should stop on shutdown.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Begin shutdown. Idempotent; every token handed out observes it.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Begin shutdown and wait up to `timeout` for `handles` to finish.
    ///
    /// Tasks still running at the deadline are left to die with the
    /// process; the timeout is logged so a slow drain can be told apart
    /// from a hung one.
    pub async fn drain(
        &self,
        handles: impl IntoIterator<Item = JoinHandle<()>>,
        timeout: Duration,
    ) {
        self.shutdown();
        let handles: Vec<_> = handles.into_iter().collect();
        info!(
            tasks = handles.len(),
            timeout_secs = timeout.as_secs(),
            "draining server tasks"
        );
        if tokio::time::timeout(timeout, future::join_all(handles))
            .await
            .is_err()
        {
            warn!(
                timeout_secs = timeout.as_secs(),
                "task drain timed out, some tasks may still be running"
            );
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
