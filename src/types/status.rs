//! Status enums for agents, synthesis and sessions

use serde::{Deserialize, Serialize};

/// Role an agent plays within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Answers the user's prompt
    Responder,
    /// Reads the responders' answers and produces the unified analysis
    Synthesizer,
}

/// Lifecycle of one agent run
///
/// `Pending → Streaming → {Completed, Failed, TimedOut}`, with `Cancelled`
/// reachable from either non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Created, no chunk received yet
    Pending,
    /// At least one chunk received
    Streaming,
    /// Final chunk received
    Completed,
    /// Driver reported an error
    Failed,
    /// Stall window or overall deadline elapsed
    TimedOut,
    /// Session was cancelled before the run finished
    Cancelled,
}

impl AgentStatus {
    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }

    /// Whether this run produced a usable final answer
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether the state machine permits moving from `self` to `next`
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match self {
            Self::Pending => !matches!(next, Self::Pending),
            Self::Streaming => next.is_terminal(),
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled => false,
        }
    }
}

/// Synthesis coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisState {
    /// Coordinator constructed, not watching yet
    Idle,
    /// Watching responders until the completion policy is met
    Waiting,
    /// Synthesizer tracker is running
    Running,
    /// Synthesizer completed
    Done,
    /// No responder completed; synthesizer never started
    Skipped,
    /// Synthesizer failed or timed out
    Failed,
    /// Session cancelled before synthesis finished
    Cancelled,
}

impl SynthesisState {
    /// Whether the coordinator has finished
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Done | Self::Skipped | Self::Failed | Self::Cancelled
        )
    }
}

/// Overall status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Registered, agent tasks not started yet
    Pending,
    /// Responders are running
    Running,
    /// Synthesizer is running
    Synthesizing,
    /// Every responder completed and synthesis is done
    Completed,
    /// Some responders did not complete, or synthesis failed after a success
    PartiallyCompleted,
    /// No responder completed
    Failed,
    /// Cancelled by a caller
    Cancelled,
}

impl SessionStatus {
    /// Whether the session has reached its final status
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::PartiallyCompleted | Self::Failed | Self::Cancelled
        )
    }
}
