//! Session status queries and output retrieval

use crate::error::{DebateError, Result};
use crate::types::{AgentId, AgentOutputPage, SessionId, SessionSnapshot};

use super::super::helpers::{calculate_has_more, paginate};
use super::core::SessionManager;

impl SessionManager {
    /// Snapshot of one session
    ///
    /// Only takes short locks; never waits on agent work.
    ///
    /// # Errors
    /// Returns `SessionNotFound` if the session is unknown or evicted
    pub async fn get_status(&self, session_id: &SessionId) -> Result<SessionSnapshot> {
        Ok(self.session(session_id).await?.snapshot())
    }

    /// Wait until the session reaches a terminal status
    ///
    /// # Errors
    /// Returns `SessionNotFound` if the session is unknown or evicted
    pub async fn wait_for_terminal(&self, session_id: &SessionId) -> Result<SessionSnapshot> {
        let session = self.session(session_id).await?;
        let mut status_rx = session.status_tx.subscribe();
        status_rx
            .wait_for(|status| status.is_terminal())
            .await
            .map_err(|_| DebateError::session_not_found(session_id.as_str()))?;
        Ok(session.snapshot())
    }

    /// Page through one agent's buffered chunks
    ///
    /// `agent_id` may name a responder or the synthesizer. A negative
    /// `offset` reads the last |offset| chunks.
    ///
    /// # Errors
    /// Returns `SessionNotFound` for an unknown session and `InvalidRequest`
    /// for an agent that is not part of it
    pub async fn agent_output(
        &self,
        session_id: &SessionId,
        agent_id: &AgentId,
        offset: i64,
        length: usize,
    ) -> Result<AgentOutputPage> {
        let session = self.session(session_id).await?;
        let tracker = session
            .tracker(agent_id)
            .or_else(|| {
                session
                    .coordinator
                    .tracker()
                    .filter(|tracker| tracker.agent_id() == agent_id)
            })
            .ok_or_else(|| {
                DebateError::invalid_request(format!(
                    "agent {agent_id} is not part of session {session_id}"
                ))
            })?;

        let status = tracker.status();
        let chunks = tracker.chunks();
        let total_chunks = chunks.len();
        let page: Vec<String> = paginate(&chunks, offset, length)
            .into_iter()
            .map(|chunk| chunk.text)
            .collect();
        let has_more = calculate_has_more(offset, page.len(), total_chunks);

        Ok(AgentOutputPage {
            session_id: session_id.clone(),
            agent_id: agent_id.clone(),
            status,
            chunks: page,
            total_chunks,
            has_more,
        })
    }
}
