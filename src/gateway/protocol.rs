//! WebSocket frame types
//!
//! Clients send JSON objects tagged by `action`; the server answers with JSON
//! objects tagged by `type`. Session stream events are forwarded verbatim
//! with the owning `session_id` added.

use serde::{Deserialize, Serialize};

use crate::error::DebateError;
use crate::types::{AgentId, AgentReadiness, SessionId, SessionSnapshot, StreamEvent};

/// Request from a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    /// Start a session and subscribe to it
    Start {
        /// User prompt
        prompt: String,
        /// Agents to query; the configured defaults when omitted
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agents: Option<Vec<AgentId>>,
    },
    /// Attach to an existing session's stream (replay, then live)
    Subscribe {
        /// Session to observe
        session_id: SessionId,
    },
    /// Cancel a session
    Cancel {
        /// Session to cancel
        session_id: SessionId,
    },
    /// Request a status snapshot
    Status {
        /// Session to inspect
        session_id: SessionId,
    },
    /// Ask every driver whether it is logged in
    CheckAuth,
    /// Keepalive
    Ping,
}

/// Reply generated by the gateway itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Session accepted; its stream follows
    SessionStarted {
        /// New session
        session_id: SessionId,
        /// Agents queried
        agents: Vec<AgentId>,
    },
    /// Cancellation signalled; the terminal status arrives on the stream
    CancelRequested {
        /// Session being cancelled
        session_id: SessionId,
    },
    /// Status snapshot
    Status {
        /// Snapshot at read time
        snapshot: SessionSnapshot,
    },
    /// Driver readiness
    AuthStatus {
        /// One entry per driver
        agents: Vec<AgentReadiness>,
    },
    /// Request failed or a subscription was dropped
    Error {
        /// Machine-readable error code
        code: String,
        /// Human-readable message
        message: String,
        /// Session the error relates to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },
    /// Keepalive reply
    Pong,
}

impl ServerFrame {
    /// Build an error frame from a [`DebateError`]
    #[must_use]
    pub fn error(session_id: Option<SessionId>, error: &DebateError) -> Self {
        Self::Error {
            code: error.code().to_string(),
            message: error.to_string(),
            session_id,
        }
    }
}

/// A session stream event addressed to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEventFrame {
    /// Session that produced the event
    pub session_id: SessionId,
    /// The event itself
    #[serde(flatten)]
    pub event: StreamEvent,
}

/// Anything the gateway writes to a socket
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    /// Gateway reply
    Frame(ServerFrame),
    /// Forwarded stream event
    Event(SessionEventFrame),
}

impl From<ServerFrame> for Outbound {
    fn from(frame: ServerFrame) -> Self {
        Self::Frame(frame)
    }
}

impl From<SessionEventFrame> for Outbound {
    fn from(frame: SessionEventFrame) -> Self {
        Self::Event(frame)
    }
}
