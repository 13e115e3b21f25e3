//! Session state structures
//!
//! A [`Session`] ties together the responder trackers, the synthesis
//! coordinator, the stream multiplexer and the cancellation token of one
//! prompt. It is owned by the session registry and shared with the
//! supervisor task through an `Arc`.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::multiplexer::StreamMultiplexer;
use crate::synthesis::SynthesisCoordinator;
use crate::tracker::AgentRunTracker;
use crate::types::{AgentId, SessionId, SessionSnapshot, SessionStatus, StreamEvent};

/// Wall-clock and monotonic completion times
#[derive(Debug, Clone, Copy)]
pub(super) struct Finished {
    pub at: DateTime<Utc>,
    pub instant: Instant,
}

/// One registered session
pub(super) struct Session {
    /// Unique session identifier
    pub id: SessionId,

    /// Original user prompt
    pub prompt: String,

    /// When the session was created (wall-clock time)
    pub created_at: DateTime<Utc>,

    /// Participating responders, in request order
    pub agents: Vec<AgentId>,

    /// One tracker per responder, same order as `agents`
    pub trackers: Vec<Arc<AgentRunTracker>>,

    /// Synthesis state machine
    pub coordinator: Arc<SynthesisCoordinator>,

    /// Session stream
    pub mux: Arc<StreamMultiplexer>,

    /// Parent of every tracker's cancellation token
    pub cancel: CancellationToken,

    /// Overall status
    pub status_tx: watch::Sender<SessionStatus>,

    /// Set once terminal
    pub finished: Mutex<Option<Finished>>,
}

impl Session {
    pub fn status(&self) -> SessionStatus {
        *self.status_tx.borrow()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn tracker(&self, agent_id: &AgentId) -> Option<Arc<AgentRunTracker>> {
        self.trackers
            .iter()
            .find(|tracker| tracker.agent_id() == agent_id)
            .cloned()
    }

    /// Stop the stream from accepting chunks, then signal every tracker
    pub fn cancel_now(&self) {
        self.mux.cancel();
        self.cancel.cancel();
    }

    /// Record a status change and publish it
    ///
    /// Terminal statuses also stamp the completion time and seal the stream.
    /// Returns `false` if the session was already terminal.
    pub fn set_status(&self, status: SessionStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if status.is_terminal() {
            *self.finished.lock() = Some(Finished {
                at: Utc::now(),
                instant: Instant::now(),
            });
        }
        self.status_tx.send_replace(status);
        self.mux.publish(StreamEvent::SessionStatus { status });
        true
    }

    /// Age since completion, `None` while the session is live
    pub fn finished_elapsed(&self) -> Option<std::time::Duration> {
        self.finished.lock().map(|finished| finished.instant.elapsed())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            prompt: self.prompt.clone(),
            created_at: self.created_at,
            finished_at: self.finished.lock().map(|finished| finished.at),
            agents: self.agents.clone(),
            status: self.status(),
            agent_runs: self.trackers.iter().map(|tracker| tracker.snapshot()).collect(),
            synthesis: self.coordinator.snapshot(),
        }
    }
}
