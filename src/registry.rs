//! Session registry with connection isolation

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::manager::SessionManager;
use crate::types::{SessionId, SessionSnapshot};

// Maps connection_id to the sessions it started
type ConnectionMap = HashMap<String, Vec<SessionId>>;

/// Connection registry for scoping sessions to the client that started them.
///
/// Provides a thin mapping layer between gateway connections and sessions so
/// that a dropped connection cancels everything it started. Subscribing to a
/// session does not tie it to the subscribing connection.
#[derive(Clone)]
pub struct ConnectionRegistry {
    connections: Arc<Mutex<ConnectionMap>>,
    manager: Arc<SessionManager>,
}

impl ConnectionRegistry {
    /// Create a new connection registry with the given `SessionManager`.
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self {
            connections: Arc::new(Mutex::new(HashMap::new())),
            manager,
        }
    }

    /// Record that `connection_id` started `session_id`
    pub async fn register_session(&self, connection_id: &str, session_id: SessionId) {
        self.connections
            .lock()
            .await
            .entry(connection_id.to_string())
            .or_default()
            .push(session_id);
    }

    /// Sessions started by a connection, in start order
    pub async fn sessions_for(&self, connection_id: &str) -> Vec<SessionId> {
        self.connections
            .lock()
            .await
            .get(connection_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshots of the sessions started by a connection
    pub async fn list_all(&self, connection_id: &str) -> Vec<SessionSnapshot> {
        let mut snapshots = Vec::new();
        for session_id in self.sessions_for(connection_id).await {
            if let Ok(snapshot) = self.manager.get_status(&session_id).await {
                snapshots.push(snapshot);
            }
        }
        snapshots
    }

    /// Get reference to `SessionManager`
    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Cancel every session of a connection (called on connection drop)
    ///
    /// Returns the number of sessions that were forgotten.
    pub async fn cleanup_connection(&self, connection_id: &str) -> usize {
        let session_ids = self
            .connections
            .lock()
            .await
            .remove(connection_id)
            .unwrap_or_default();

        let count = session_ids.len();
        for session_id in session_ids {
            log::debug!(
                "Cancelling session {} for connection {}",
                session_id,
                connection_id
            );
            if let Err(e) = self.manager.cancel_session(&session_id).await {
                // Already evicted
                log::debug!(
                    "Failed to cancel session {} during connection cleanup: {}",
                    session_id,
                    e
                );
            }
        }
        count
    }
}
