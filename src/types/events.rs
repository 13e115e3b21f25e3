//! Chunk and stream event types
//!
//! [`ChunkEvent`] is what flows from a driver run into the multiplexer.
//! [`StreamEvent`] is the public per-session contract observed by subscribers
//! and, serialized, by the WebSocket gateway.

use serde::{Deserialize, Serialize};

use super::identifiers::AgentId;
use super::status::{AgentStatus, SessionStatus, SynthesisState};

/// One sequence-numbered fragment of an agent's response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkEvent {
    /// Agent that produced the fragment
    pub agent_id: AgentId,
    /// Per-agent sequence number, strictly increasing
    pub sequence: u64,
    /// Text fragment (a delta, not the cumulative response)
    pub text: String,
    /// Marks the terminal chunk of a successful run
    pub is_final: bool,
}

/// Event in a session's multiplexed stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Responder text fragment
    Chunk {
        /// Origin agent
        agent_id: AgentId,
        /// Per-agent sequence number
        sequence: u64,
        /// Text fragment
        text: String,
    },
    /// Responder status transition
    AgentStatus {
        /// Agent whose status changed
        agent_id: AgentId,
        /// New status
        status: AgentStatus,
        /// Terminal error, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Synthesizer text fragment
    SynthesisChunk {
        /// Synthesizer sequence number
        sequence: u64,
        /// Text fragment
        text: String,
    },
    /// Synthesis coordinator state change
    SynthesisStatus {
        /// New coordinator state
        status: SynthesisState,
        /// Reason for `skipped`/`failed`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Overall session status change; terminal statuses close the stream
    SessionStatus {
        /// New session status
        status: SessionStatus,
    },
}

impl StreamEvent {
    /// Agent this event belongs to, for responder events
    #[must_use]
    pub fn agent_id(&self) -> Option<&AgentId> {
        match self {
            Self::Chunk { agent_id, .. } | Self::AgentStatus { agent_id, .. } => Some(agent_id),
            _ => None,
        }
    }

    /// Whether this event carries response text
    #[must_use]
    pub const fn is_chunk(&self) -> bool {
        matches!(self, Self::Chunk { .. } | Self::SynthesisChunk { .. })
    }

    /// Whether this is the session's final event
    #[must_use]
    pub const fn is_session_terminal(&self) -> bool {
        matches!(self, Self::SessionStatus { status } if status.is_terminal())
    }
}
