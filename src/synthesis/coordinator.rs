//! Synthesis coordinator state machine
//!
//! `Idle → Waiting → Running → {Done, Skipped, Failed}`, with `Cancelled`
//! reachable until the synthesizer finishes.

use std::sync::Arc;
use std::time::Duration;

use futures::future::select_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::policy::{CompletionPolicy, PolicyDecision};
use super::prompt::build_meta_prompt;
use crate::driver::AgentDriver;
use crate::error::DebateError;
use crate::multiplexer::StreamMultiplexer;
use crate::tracker::{AgentRun, AgentRunTracker, drive_agent};
use crate::types::{
    AgentId, AgentRole, AgentStatus, SessionId, StreamEvent, SynthesisSnapshot, SynthesisState,
};

/// Inputs for one synthesis pass
pub struct SynthesisContext {
    /// Original user prompt
    pub prompt: String,
    /// Responder trackers to watch
    pub responders: Vec<Arc<AgentRunTracker>>,
    /// Driver for the synthesizer
    pub driver: Arc<dyn AgentDriver>,
    /// Identifier of the synthesizer tracker
    pub synthesis_agent: AgentId,
    /// Session stream
    pub mux: Arc<StreamMultiplexer>,
    /// Session cancellation
    pub cancel: CancellationToken,
    /// Stall window for the synthesizer
    pub stall_timeout: Duration,
    /// Overall deadline for the synthesizer
    pub max_duration: Option<Duration>,
}

struct CoordinatorInner {
    state: SynthesisState,
    tracker: Option<Arc<AgentRunTracker>>,
    error: Option<String>,
}

/// Watches a session's responders and runs the synthesizer
pub struct SynthesisCoordinator {
    session_id: SessionId,
    policy: CompletionPolicy,
    inner: Mutex<CoordinatorInner>,
    state_tx: watch::Sender<SynthesisState>,
}

impl SynthesisCoordinator {
    /// Create an `Idle` coordinator
    #[must_use]
    pub fn new(session_id: SessionId, policy: CompletionPolicy) -> Self {
        let (state_tx, _) = watch::channel(SynthesisState::Idle);
        Self {
            session_id,
            policy,
            inner: Mutex::new(CoordinatorInner {
                state: SynthesisState::Idle,
                tracker: None,
                error: None,
            }),
            state_tx,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SynthesisState {
        self.inner.lock().state
    }

    /// Synthesizer tracker, once started
    #[must_use]
    pub fn tracker(&self) -> Option<Arc<AgentRunTracker>> {
        self.inner.lock().tracker.clone()
    }

    /// Watch state transitions
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<SynthesisState> {
        self.state_tx.subscribe()
    }

    /// Point-in-time view
    #[must_use]
    pub fn snapshot(&self) -> SynthesisSnapshot {
        let inner = self.inner.lock();
        SynthesisSnapshot {
            state: inner.state,
            tracker: inner.tracker.as_ref().map(|tracker| tracker.snapshot()),
            error: inner.error.clone(),
        }
    }

    /// Force a `Failed` state if the coordinator has not finished
    ///
    /// Used when the coordinator task itself died.
    pub(crate) fn fail(&self, mux: &StreamMultiplexer, reason: &str) {
        let error = DebateError::synthesis_failure(reason);
        self.transition(mux, SynthesisState::Failed, Some(error.to_string()));
    }

    /// Wait for the completion policy, then drive the synthesizer
    ///
    /// Returns the terminal state.
    pub async fn run(&self, ctx: SynthesisContext) -> SynthesisState {
        let SynthesisContext {
            prompt,
            responders,
            driver,
            synthesis_agent,
            mux,
            cancel,
            stall_timeout,
            max_duration,
        } = ctx;

        if cancel.is_cancelled() {
            self.transition(&mux, SynthesisState::Cancelled, None);
            return self.state();
        }
        self.transition(&mux, SynthesisState::Waiting, None);

        let mut watchers: Vec<watch::Receiver<AgentStatus>> = responders
            .iter()
            .map(|tracker| tracker.subscribe_status())
            .collect();

        loop {
            let statuses: Vec<AgentStatus> = responders.iter().map(|t| t.status()).collect();
            match self.policy.evaluate(&statuses) {
                PolicyDecision::Proceed => break,
                PolicyDecision::Skip => {
                    let error = DebateError::synthesis_skipped("no responder completed");
                    log::warn!("[{}] {error}", self.session_id);
                    self.transition(&mux, SynthesisState::Skipped, Some(error.to_string()));
                    return self.state();
                }
                PolicyDecision::Wait => {}
            }

            let changed = select_all(watchers.iter_mut().map(|rx| Box::pin(rx.changed())));
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    self.transition(&mux, SynthesisState::Cancelled, None);
                    return self.state();
                }
                _ = changed => {}
            }
        }

        let responses: Vec<(AgentId, String)> = responders
            .iter()
            .filter(|tracker| tracker.status().is_success())
            .map(|tracker| (tracker.agent_id().clone(), tracker.final_text()))
            .collect();
        log::info!(
            "[{}] Starting synthesis over {} response(s)",
            self.session_id,
            responses.len()
        );

        let tracker = Arc::new(AgentRunTracker::new(
            synthesis_agent,
            AgentRole::Synthesizer,
        ));
        self.inner.lock().tracker = Some(Arc::clone(&tracker));
        self.transition(&mux, SynthesisState::Running, None);

        let status = drive_agent(AgentRun {
            session_id: self.session_id.clone(),
            tracker: Arc::clone(&tracker),
            driver,
            prompt: build_meta_prompt(&prompt, &responses),
            mux: Arc::clone(&mux),
            cancel: cancel.child_token(),
            stall_timeout,
            max_duration,
        })
        .await;

        match status {
            AgentStatus::Completed => self.transition(&mux, SynthesisState::Done, None),
            AgentStatus::Cancelled => self.transition(&mux, SynthesisState::Cancelled, None),
            _ => {
                let reason = tracker
                    .snapshot()
                    .error
                    .unwrap_or_else(|| format!("synthesizer ended as {status:?}"));
                let error = DebateError::synthesis_failure(reason);
                log::warn!("[{}] {error}", self.session_id);
                self.transition(&mux, SynthesisState::Failed, Some(error.to_string()));
            }
        }
        self.state()
    }

    fn transition(&self, mux: &StreamMultiplexer, state: SynthesisState, error: Option<String>) {
        // Held while publishing so stream order matches transition order
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() || inner.state == state {
            return;
        }
        inner.state = state;
        inner.error.clone_from(&error);

        log::debug!("[{}] Synthesis {state:?}", self.session_id);
        self.state_tx.send_replace(state);
        mux.publish(StreamEvent::SynthesisStatus {
            status: state,
            error,
        });
    }
}
