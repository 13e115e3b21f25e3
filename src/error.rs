//! Error types for the debate orchestrator

use thiserror::Error;

/// Main error type for the debate orchestrator
#[derive(Error, Debug)]
pub enum DebateError {
    /// No chunk arrived from an agent within its stall window
    #[error("Agent {agent} timed out: {message}")]
    AgentTimeout {
        /// Agent that stalled
        agent: String,
        /// Description of the window that elapsed
        message: String,
    },

    /// The agent driver reported a failure (layout change, rejected submission, ...)
    #[error("Agent driver error ({agent}): {message}")]
    AgentDriver {
        /// Agent whose driver failed
        agent: String,
        /// Driver-provided failure message
        message: String,
    },

    /// A stream subscriber fell behind its bounded queue and was disconnected
    #[error("Subscriber {0} fell behind and was disconnected")]
    SubscriberOverflow(u64),

    /// Synthesis never ran because no responder completed
    #[error("Synthesis skipped: {0}")]
    SynthesisSkipped(String),

    /// The synthesizer errored or timed out
    #[error("Synthesis failed: {0}")]
    SynthesisFailure(String),

    /// Malformed session start request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Session is not (or no longer) registered
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Driver executable or registration could not be found
    #[error("Agent driver not found: {0}")]
    DriverNotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decode error when parsing driver output or client frames
    #[error("JSON decode error: {0}")]
    JsonDecode(#[from] serde_json::Error),
}

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, DebateError>;

impl DebateError {
    /// Create an agent timeout error
    pub fn agent_timeout(agent: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::AgentTimeout {
            agent: agent.into(),
            message: msg.into(),
        }
    }

    /// Create an agent driver error
    pub fn agent_driver(agent: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::AgentDriver {
            agent: agent.into(),
            message: msg.into(),
        }
    }

    /// Create a subscriber overflow error
    #[must_use]
    pub fn subscriber_overflow(subscriber_id: u64) -> Self {
        Self::SubscriberOverflow(subscriber_id)
    }

    /// Create a synthesis skipped error
    pub fn synthesis_skipped(msg: impl Into<String>) -> Self {
        Self::SynthesisSkipped(msg.into())
    }

    /// Create a synthesis failure error
    pub fn synthesis_failure(msg: impl Into<String>) -> Self {
        Self::SynthesisFailure(msg.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a session not found error
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound(session_id.into())
    }

    /// Create a driver not found error
    pub fn driver_not_found(msg: impl Into<String>) -> Self {
        Self::DriverNotFound(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Short machine-readable code used by the gateway's error frames
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AgentTimeout { .. } => "agent_timeout",
            Self::AgentDriver { .. } => "agent_driver_error",
            Self::SubscriberOverflow(_) => "subscriber_overflow",
            Self::SynthesisSkipped(_) => "synthesis_skipped",
            Self::SynthesisFailure(_) => "synthesis_failure",
            Self::InvalidRequest(_) => "invalid_request",
            Self::SessionNotFound(_) => "session_not_found",
            Self::DriverNotFound(_) => "driver_not_found",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Io(_) => "io",
            Self::JsonDecode(_) => "json_decode",
        }
    }
}
