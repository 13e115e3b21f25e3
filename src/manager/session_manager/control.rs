//! Session cancellation and subscription

use crate::error::Result;
use crate::multiplexer::Subscription;
use crate::types::SessionId;

use super::core::SessionManager;

impl SessionManager {
    /// Cancel a session
    ///
    /// Signals every non-terminal tracker and returns immediately; the
    /// session reaches `Cancelled` asynchronously, but no chunk is published
    /// once this returns. Cancelling a finished or
    /// already-cancelled session is a no-op.
    ///
    /// # Errors
    /// Returns `SessionNotFound` if the session is unknown or evicted
    pub async fn cancel_session(&self, session_id: &SessionId) -> Result<()> {
        let session = self.session(session_id).await?;
        if session.is_terminal() || session.cancel.is_cancelled() {
            log::debug!("[{session_id}] Cancel ignored, session already settling");
            return Ok(());
        }
        log::info!("[{session_id}] Cancelling session");
        session.cancel_now();
        Ok(())
    }

    /// Attach to a session's stream with the configured queue bound
    ///
    /// # Errors
    /// Returns `SessionNotFound` if the session is unknown or evicted
    pub async fn subscribe(&self, session_id: &SessionId) -> Result<Subscription> {
        self.subscribe_with_capacity(session_id, self.options.subscriber_capacity)
            .await
    }

    /// Attach to a session's stream with an explicit queue bound
    ///
    /// # Errors
    /// Returns `SessionNotFound` if the session is unknown or evicted
    pub async fn subscribe_with_capacity(
        &self,
        session_id: &SessionId,
        capacity: usize,
    ) -> Result<Subscription> {
        let session = self.session(session_id).await?;
        Ok(session.mux.subscribe(capacity))
    }
}
