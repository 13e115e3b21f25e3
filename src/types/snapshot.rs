//! Point-in-time views returned by the session manager

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identifiers::{AgentId, SessionId};
use super::status::{AgentRole, AgentStatus, SessionStatus, SynthesisState};

/// Snapshot of one agent run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    /// Agent identifier
    pub agent_id: AgentId,

    /// Responder or synthesizer
    pub role: AgentRole,

    /// Current status
    pub status: AgentStatus,

    /// Number of chunks buffered so far
    pub chunk_count: usize,

    /// Bytes of response text buffered so far
    pub text_len: usize,

    /// When the driving task started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run reached a terminal status
    pub ended_at: Option<DateTime<Utc>>,

    /// Runtime in milliseconds (up to now while still running)
    pub runtime_ms: u64,

    /// Terminal error message, if the run failed or timed out
    pub error: Option<String>,
}

/// Synthesis section of a session snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisSnapshot {
    /// Coordinator state
    pub state: SynthesisState,

    /// Synthesizer tracker, once started
    pub tracker: Option<AgentSnapshot>,

    /// Reason for `skipped`/`failed`
    pub error: Option<String>,
}

/// Snapshot returned by `get_status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session identifier
    pub session_id: SessionId,

    /// Original user prompt
    pub prompt: String,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session reached a terminal status
    pub finished_at: Option<DateTime<Utc>>,

    /// Participating responders, in request order
    pub agents: Vec<AgentId>,

    /// Overall status
    pub status: SessionStatus,

    /// Per-responder snapshots, in request order
    pub agent_runs: Vec<AgentSnapshot>,

    /// Synthesis outcome, reported separately from responder statuses
    pub synthesis: SynthesisSnapshot,
}

impl SessionSnapshot {
    /// Look up one responder's snapshot
    #[must_use]
    pub fn agent(&self, agent_id: &AgentId) -> Option<&AgentSnapshot> {
        self.agent_runs.iter().find(|run| &run.agent_id == agent_id)
    }
}

/// Readiness of one configured driver (e.g. whether its site session is logged in)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReadiness {
    /// Agent identifier
    pub agent_id: AgentId,

    /// TRUE if the driver reports it can accept prompts
    pub ready: bool,

    /// Error raised while checking, if any
    pub error: Option<String>,
}

/// One page of an agent's buffered output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutputPage {
    /// Session identifier
    pub session_id: SessionId,

    /// Agent identifier
    pub agent_id: AgentId,

    /// Agent status at read time
    pub status: AgentStatus,

    /// Text fragments in this page, in sequence order
    pub chunks: Vec<String>,

    /// Total chunks buffered
    pub total_chunks: usize,

    /// More chunks available for pagination
    /// TRUE if: offset+length < `total_chunks` (for positive offset)
    /// FALSE if: reading tail OR no more chunks
    pub has_more: bool,
}
