//! Mutable state of one agent run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::types::AgentStatus;

/// One buffered response fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferedChunk {
    /// Driver sequence number
    pub sequence: u64,
    /// Text delta
    pub text: String,
}

/// Result of offering a chunk to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AppendOutcome {
    /// Chunk stored; `first` if this moved the run to `Streaming`
    Appended { first: bool },
    /// Same sequence number as the previous chunk; ignored
    Duplicate,
    /// Sequence number went backwards
    OutOfOrder { last: u64 },
    /// Run is already terminal
    Closed,
}

#[derive(Debug)]
pub(crate) struct TrackerState {
    pub status: AgentStatus,
    pub chunks: Vec<BufferedChunk>,
    pub text_len: usize,
    pub last_sequence: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub started: Option<Instant>,
    pub ended_at: Option<DateTime<Utc>>,
    pub runtime_ms: Option<u64>,
    pub error: Option<String>,
}

impl TrackerState {
    pub fn new() -> Self {
        Self {
            status: AgentStatus::Pending,
            chunks: Vec::new(),
            text_len: 0,
            last_sequence: None,
            started_at: None,
            started: None,
            ended_at: None,
            runtime_ms: None,
            error: None,
        }
    }

    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
            self.started_at = Some(Utc::now());
        }
    }

    pub fn append(&mut self, sequence: u64, text: &str) -> AppendOutcome {
        if self.status.is_terminal() {
            return AppendOutcome::Closed;
        }
        if let Some(last) = self.last_sequence {
            if sequence == last {
                return AppendOutcome::Duplicate;
            }
            if sequence < last {
                return AppendOutcome::OutOfOrder { last };
            }
        }

        self.last_sequence = Some(sequence);
        self.text_len += text.len();
        self.chunks.push(BufferedChunk {
            sequence,
            text: text.to_string(),
        });

        let first = self.status == AgentStatus::Pending;
        if first {
            self.status = AgentStatus::Streaming;
        }
        AppendOutcome::Appended { first }
    }

    /// Move to a terminal status; `false` if the transition is not allowed
    pub fn finish(&mut self, status: AgentStatus, error: Option<String>) -> bool {
        if !status.is_terminal() || !self.status.can_transition_to(status) {
            return false;
        }
        self.status = status;
        self.error = error;
        self.ended_at = Some(Utc::now());
        self.runtime_ms = Some(self.elapsed_ms());
        true
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.runtime_ms.unwrap_or_else(|| {
            self.started
                .map_or(0, |started| {
                    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
                })
        })
    }

    pub fn text(&self) -> String {
        self.chunks.iter().map(|chunk| chunk.text.as_str()).collect()
    }
}
