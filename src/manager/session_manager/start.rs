//! Session start logic
//!
//! Validates the request, registers the session, and launches one driving
//! task per responder plus the session supervisor.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::driver::AgentDriver;
use crate::error::{DebateError, Result};
use crate::multiplexer::StreamMultiplexer;
use crate::synthesis::{SynthesisContext, SynthesisCoordinator};
use crate::tracker::{AgentRun, AgentRunTracker, spawn_agent_run};
use crate::types::{AgentId, AgentRole, SessionId, SessionStatus};

use super::super::background::spawn_session_supervisor;
use super::super::session::Session;
use super::core::SessionManager;

impl SessionManager {
    /// Start a session querying `agents` with `prompt`
    ///
    /// Returns as soon as the session is registered; agents run in the
    /// background.
    ///
    /// # Errors
    /// Returns `InvalidRequest` (and creates nothing) if the prompt is blank,
    /// the agent list is empty or has duplicates, an agent has no registered
    /// driver, or an agent collides with the synthesizer id
    pub async fn start_session(
        &self,
        prompt: impl Into<String>,
        agents: Vec<AgentId>,
    ) -> Result<SessionId> {
        let prompt = prompt.into();
        let drivers = self.validate_request(&prompt, &agents)?;

        let session_id = SessionId::generate();
        let cancel = CancellationToken::new();
        let mux = Arc::new(StreamMultiplexer::new(session_id.clone()));
        let coordinator = Arc::new(SynthesisCoordinator::new(
            session_id.clone(),
            self.options.completion_policy,
        ));
        let trackers: Vec<Arc<AgentRunTracker>> = agents
            .iter()
            .map(|agent| Arc::new(AgentRunTracker::new(agent.clone(), AgentRole::Responder)))
            .collect();
        let (status_tx, _) = watch::channel(SessionStatus::Pending);

        let session = Arc::new(Session {
            id: session_id.clone(),
            prompt: prompt.clone(),
            created_at: Utc::now(),
            agents,
            trackers,
            coordinator,
            mux: Arc::clone(&mux),
            cancel: cancel.clone(),
            status_tx,
            finished: Mutex::new(None),
        });

        self.sessions
            .lock()
            .await
            .insert(session_id.clone(), Arc::clone(&session));
        log::info!(
            "[{session_id}] Session created for {} agent(s)",
            session.agents.len()
        );

        session.set_status(SessionStatus::Running);

        let mut runners = Vec::with_capacity(session.trackers.len());
        for (tracker, driver) in session.trackers.iter().zip(drivers) {
            runners.push(spawn_agent_run(AgentRun {
                session_id: session_id.clone(),
                tracker: Arc::clone(tracker),
                driver,
                prompt: prompt.clone(),
                mux: Arc::clone(&mux),
                cancel: cancel.child_token(),
                stall_timeout: self.options.stall_timeout_for(tracker.agent_id()),
                max_duration: self.options.max_duration,
            }));
        }

        let ctx = SynthesisContext {
            prompt,
            responders: session.trackers.clone(),
            driver: self.drivers.synthesizer(),
            synthesis_agent: self.options.synthesis_agent.clone(),
            mux,
            cancel,
            stall_timeout: self.options.stall_timeout_for(&self.options.synthesis_agent),
            max_duration: self.options.max_duration,
        };
        spawn_session_supervisor(session, runners, ctx);

        Ok(session_id)
    }

    /// Start a session with the configured default agents
    ///
    /// # Errors
    /// Same as [`SessionManager::start_session`]
    pub async fn start_default_session(&self, prompt: impl Into<String>) -> Result<SessionId> {
        self.start_session(prompt, self.options.default_agents.clone())
            .await
    }

    /// Check a start request, returning the driver of each agent in order
    fn validate_request(
        &self,
        prompt: &str,
        agents: &[AgentId],
    ) -> Result<Vec<Arc<dyn AgentDriver>>> {
        if prompt.trim().is_empty() {
            return Err(DebateError::invalid_request("prompt is empty"));
        }
        if agents.is_empty() {
            return Err(DebateError::invalid_request("agent list is empty"));
        }

        let mut seen = HashSet::with_capacity(agents.len());
        let mut drivers = Vec::with_capacity(agents.len());
        for agent in agents {
            if !seen.insert(agent) {
                return Err(DebateError::invalid_request(format!(
                    "agent {agent} listed more than once"
                )));
            }
            if agent == &self.options.synthesis_agent {
                return Err(DebateError::invalid_request(format!(
                    "agent {agent} is reserved for synthesis"
                )));
            }
            let driver = self.drivers.get(agent).ok_or_else(|| {
                DebateError::invalid_request(format!("no driver registered for agent {agent}"))
            })?;
            drivers.push(driver);
        }
        Ok(drivers)
    }
}
