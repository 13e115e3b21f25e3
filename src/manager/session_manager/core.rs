//! Core session manager structure and lifecycle management
//!
//! Provides the main `SessionManager` struct with initialization, cleanup, and shutdown.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::driver::DriverSet;
use crate::error::{DebateError, Result};
use crate::types::{OrchestratorOptions, SessionId};

use super::super::session::Session;

pub(super) type SessionMap = HashMap<SessionId, Arc<Session>>;

// ============================================================================
// SESSION MANAGER CORE
// ============================================================================

/// Manager for concurrent debate sessions
///
/// The `SessionManager` coordinates every session of the process, handling:
/// - Session lifecycle (start, cancel, terminal aggregation)
/// - Live subscriptions with replay
/// - Driver readiness checks
/// - Automatic eviction of terminal sessions after the retention window
pub struct SessionManager {
    pub(super) sessions: Arc<Mutex<SessionMap>>,
    pub(super) drivers: DriverSet,
    pub(super) options: OrchestratorOptions,
    cleanup_handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Create a new `SessionManager` with background cleanup task
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(drivers: DriverSet, options: OrchestratorOptions) -> Self {
        let sessions: Arc<Mutex<SessionMap>> = Arc::new(Mutex::new(HashMap::new()));

        // Spawn cleanup background task
        let sessions_clone = Arc::clone(&sessions);
        let retention = options.retention;
        let interval = options.cleanup_interval;
        let cleanup_handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let mut sessions = sessions_clone.lock().await;
                let before = sessions.len();

                // Remove terminal sessions older than retention period
                sessions.retain(|_id, session| {
                    session
                        .finished_elapsed()
                        .is_none_or(|age| age < retention)
                });

                let evicted = before - sessions.len();
                if evicted > 0 {
                    log::debug!("Evicted {evicted} finished session(s)");
                }
            }
        });

        Self {
            sessions,
            drivers,
            options,
            cleanup_handle: parking_lot::Mutex::new(Some(cleanup_handle)),
        }
    }

    /// Options this manager was built with
    #[must_use]
    pub const fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Registered drivers
    #[must_use]
    pub const fn drivers(&self) -> &DriverSet {
        &self.drivers
    }

    /// Number of registered sessions (live and retained)
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub(super) async fn session(&self, session_id: &SessionId) -> Result<Arc<Session>> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| DebateError::session_not_found(session_id.as_str()))
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup_handle.get_mut().take() {
            handle.abort();
        }
    }
}

impl SessionManager {
    /// Gracefully shutdown the `SessionManager`
    ///
    /// Cancels every live session, waits up to the configured grace period
    /// for them to settle, and stops the cleanup task.
    pub async fn shutdown(&self) -> Result<()> {
        log::info!("Shutting down SessionManager...");

        let live: Vec<Arc<Session>> = {
            let sessions = self.sessions.lock().await;
            sessions
                .values()
                .filter(|session| !session.is_terminal())
                .cloned()
                .collect()
        };

        for session in &live {
            log::debug!("Cancelling session: {}", session.id);
            session.cancel_now();
        }

        let settle = join_all(live.iter().map(|session| {
            let mut status_rx = session.status_tx.subscribe();
            async move {
                let _ = status_rx.wait_for(|status| status.is_terminal()).await;
            }
        }));
        if tokio::time::timeout(self.options.cancel_grace, settle)
            .await
            .is_err()
        {
            log::warn!(
                "Sessions still running after {:?} grace period",
                self.options.cancel_grace
            );
        }

        if let Some(handle) = self.cleanup_handle.lock().take() {
            handle.abort();
        }

        log::info!("SessionManager shutdown complete");
        Ok(())
    }
}
