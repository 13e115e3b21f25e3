//! When synthesis may start

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DebateError;
use crate::types::AgentStatus;

/// Threshold for triggering the synthesizer
///
/// Every policy falls back to [`CompletionPolicy::AllTerminal`] once all
/// responders are terminal, so a session can always make progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Every responder terminal and at least one completed
    #[default]
    AllTerminal,
    /// First completed responder
    AnySuccess,
    /// More than half of the responders completed
    Majority,
}

/// What the coordinator should do given the current responder statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Keep watching
    Wait,
    /// Start the synthesizer
    Proceed,
    /// Every responder is terminal and none completed
    Skip,
}

impl CompletionPolicy {
    /// Evaluate the policy against responder statuses
    #[must_use]
    pub fn evaluate(self, statuses: &[AgentStatus]) -> PolicyDecision {
        let completed = statuses.iter().filter(|s| s.is_success()).count();
        let all_terminal = statuses.iter().all(|s| s.is_terminal());

        if all_terminal {
            return if completed > 0 {
                PolicyDecision::Proceed
            } else {
                PolicyDecision::Skip
            };
        }

        let met = match self {
            Self::AllTerminal => false,
            Self::AnySuccess => completed >= 1,
            Self::Majority => completed * 2 > statuses.len(),
        };
        if met {
            PolicyDecision::Proceed
        } else {
            PolicyDecision::Wait
        }
    }
}

impl FromStr for CompletionPolicy {
    type Err = DebateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all_terminal" => Ok(Self::AllTerminal),
            "any" | "any_success" => Ok(Self::AnySuccess),
            "majority" => Ok(Self::Majority),
            other => Err(DebateError::invalid_config(format!(
                "unknown completion policy {other:?} (expected all, any or majority)"
            ))),
        }
    }
}

impl fmt::Display for CompletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AllTerminal => "all_terminal",
            Self::AnySuccess => "any_success",
            Self::Majority => "majority",
        })
    }
}
