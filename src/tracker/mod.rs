//! Per-agent run tracking
//!
//! An [`AgentRunTracker`] owns the state of one agent's execution within one
//! session: status, the ordered chunk buffer, timing and the terminal error.
//! Only the task driving that agent ([`runner`]) advances it; everyone else
//! reads snapshots or watches the status channel.

pub mod runner;
mod state;

pub use runner::{AgentRun, drive_agent, spawn_agent_run};
pub use state::BufferedChunk;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::types::{AgentId, AgentRole, AgentSnapshot, AgentStatus};
use state::{AppendOutcome, TrackerState};

/// State of one agent's run within one session
#[derive(Debug)]
pub struct AgentRunTracker {
    agent_id: AgentId,
    role: AgentRole,
    state: Mutex<TrackerState>,
    status_tx: watch::Sender<AgentStatus>,
}

impl AgentRunTracker {
    /// Create a `Pending` tracker
    #[must_use]
    pub fn new(agent_id: AgentId, role: AgentRole) -> Self {
        let (status_tx, _) = watch::channel(AgentStatus::Pending);
        Self {
            agent_id,
            role,
            state: Mutex::new(TrackerState::new()),
            status_tx,
        }
    }

    /// Agent identifier
    #[must_use]
    pub const fn agent_id(&self) -> &AgentId {
        &self.agent_id
    }

    /// Responder or synthesizer
    #[must_use]
    pub const fn role(&self) -> AgentRole {
        self.role
    }

    /// Current status
    #[must_use]
    pub fn status(&self) -> AgentStatus {
        self.state.lock().status
    }

    /// Whether the run has finished
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Watch status transitions
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<AgentStatus> {
        self.status_tx.subscribe()
    }

    /// Concatenated response text received so far
    #[must_use]
    pub fn final_text(&self) -> String {
        self.state.lock().text()
    }

    /// Copy of the chunk buffer
    #[must_use]
    pub fn chunks(&self) -> Vec<BufferedChunk> {
        self.state.lock().chunks.clone()
    }

    /// Number of buffered chunks
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.state.lock().chunks.len()
    }

    /// Point-in-time view
    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        let state = self.state.lock();
        AgentSnapshot {
            agent_id: self.agent_id.clone(),
            role: self.role,
            status: state.status,
            chunk_count: state.chunks.len(),
            text_len: state.text_len,
            started_at: state.started_at,
            ended_at: state.ended_at,
            runtime_ms: state.elapsed_ms(),
            error: state.error.clone(),
        }
    }

    pub(crate) fn mark_started(&self) {
        self.state.lock().start();
    }

    pub(crate) fn append_chunk(&self, sequence: u64, text: &str) -> AppendOutcome {
        let outcome = self.state.lock().append(sequence, text);
        if matches!(outcome, AppendOutcome::Appended { first: true }) {
            self.status_tx.send_replace(AgentStatus::Streaming);
        }
        outcome
    }

    /// Move to a terminal status; `false` if already terminal
    pub(crate) fn finish(&self, status: AgentStatus, error: Option<String>) -> bool {
        let finished = self.state.lock().finish(status, error);
        if finished {
            self.status_tx.send_replace(status);
        }
        finished
    }
}
