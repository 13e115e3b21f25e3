//! The task that drives one agent
//!
//! Each run owns its driver stream and is the only writer of its tracker.
//! Stall timeout, optional overall deadline and session cancellation are all
//! observed at the same suspension point.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::AgentRunTracker;
use super::state::AppendOutcome;
use crate::driver::{AgentDriver, DriverEvent};
use crate::error::DebateError;
use crate::multiplexer::StreamMultiplexer;
use crate::types::{AgentRole, AgentStatus, ChunkEvent, SessionId, StreamEvent};

/// Everything needed to drive one agent through one prompt
pub struct AgentRun {
    /// Session the run belongs to (for logging)
    pub session_id: SessionId,
    /// Tracker this run writes to
    pub tracker: Arc<AgentRunTracker>,
    /// Driver producing the response
    pub driver: Arc<dyn AgentDriver>,
    /// Prompt to submit
    pub prompt: String,
    /// Session stream
    pub mux: Arc<StreamMultiplexer>,
    /// Fires when the run must stop
    pub cancel: CancellationToken,
    /// Maximum gap between chunks (and before the first one)
    pub stall_timeout: Duration,
    /// Maximum total runtime
    pub max_duration: Option<Duration>,
}

enum Step {
    Cancelled,
    Deadline,
    Stalled,
    Event(Option<DriverEvent>),
}

/// Spawn [`drive_agent`] on the runtime
pub fn spawn_agent_run(run: AgentRun) -> JoinHandle<AgentStatus> {
    tokio::spawn(drive_agent(run))
}

/// Drive one agent to a terminal status
///
/// Chunks are appended to the tracker and published to the multiplexer as
/// they arrive. Responders also publish `agent_status` events; the
/// synthesizer's status is reported by the synthesis coordinator instead.
pub async fn drive_agent(run: AgentRun) -> AgentStatus {
    let AgentRun {
        session_id,
        tracker,
        driver,
        prompt,
        mux,
        cancel,
        stall_timeout,
        max_duration,
    } = run;
    let agent_id = tracker.agent_id().clone();
    let role = tracker.role();

    tracker.mark_started();
    log::debug!("[{session_id}] [{agent_id}] Submitting prompt ({} bytes)", prompt.len());

    let mut stream = driver.submit(prompt, cancel.clone());
    let deadline = max_duration.map(|limit| Instant::now() + limit);

    let (status, error) = loop {
        let overall = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        let step = tokio::select! {
            biased;
            () = cancel.cancelled() => Step::Cancelled,
            () = overall => Step::Deadline,
            () = tokio::time::sleep(stall_timeout) => Step::Stalled,
            event = stream.next() => Step::Event(event),
        };

        match step {
            Step::Cancelled => break (AgentStatus::Cancelled, None),
            Step::Deadline => {
                let limit = max_duration.unwrap_or_default();
                break (
                    AgentStatus::TimedOut,
                    Some(DebateError::agent_timeout(
                        agent_id.as_str(),
                        format!("no final chunk within {}s", limit.as_secs()),
                    )),
                );
            }
            Step::Stalled => {
                break (
                    AgentStatus::TimedOut,
                    Some(DebateError::agent_timeout(
                        agent_id.as_str(),
                        format!("no chunk for {}s", stall_timeout.as_secs()),
                    )),
                );
            }
            Step::Event(None) => {
                break (
                    AgentStatus::Failed,
                    Some(DebateError::agent_driver(
                        agent_id.as_str(),
                        "stream ended without a final chunk",
                    )),
                );
            }
            Step::Event(Some(DriverEvent::Error(message))) => {
                break (
                    AgentStatus::Failed,
                    Some(DebateError::agent_driver(agent_id.as_str(), message)),
                );
            }
            // Taken from the driver after the cancel fired
            Step::Event(Some(DriverEvent::Chunk { .. })) if cancel.is_cancelled() => {
                break (AgentStatus::Cancelled, None);
            }
            Step::Event(Some(DriverEvent::Chunk {
                sequence,
                text,
                is_final,
            })) => match tracker.append_chunk(sequence, &text) {
                AppendOutcome::Appended { first } => {
                    if first && role == AgentRole::Responder {
                        mux.publish(StreamEvent::AgentStatus {
                            agent_id: agent_id.clone(),
                            status: AgentStatus::Streaming,
                            error: None,
                        });
                    }
                    mux.publish_chunk(
                        role,
                        &ChunkEvent {
                            agent_id: agent_id.clone(),
                            sequence,
                            text,
                            is_final,
                        },
                    );
                    if is_final {
                        break (AgentStatus::Completed, None);
                    }
                }
                AppendOutcome::Duplicate => {
                    log::debug!("[{session_id}] [{agent_id}] Ignoring repeated chunk #{sequence}");
                    if is_final {
                        break (AgentStatus::Completed, None);
                    }
                }
                AppendOutcome::OutOfOrder { last } => {
                    break (
                        AgentStatus::Failed,
                        Some(DebateError::agent_driver(
                            agent_id.as_str(),
                            format!("chunk #{sequence} arrived after #{last}"),
                        )),
                    );
                }
                AppendOutcome::Closed => return tracker.status(),
            },
        }
    };

    // Release driver resources before reporting
    drop(stream);

    let message = error.as_ref().map(ToString::to_string);
    if tracker.finish(status, message.clone()) {
        match &message {
            Some(message) => log::warn!("[{session_id}] [{agent_id}] {status:?}: {message}"),
            None => log::info!("[{session_id}] [{agent_id}] {status:?}"),
        }
        match role {
            AgentRole::Responder => {
                mux.publish(StreamEvent::AgentStatus {
                    agent_id,
                    status,
                    error: message,
                });
            }
            AgentRole::Synthesizer => mux.close_agent(&agent_id),
        }
    }

    tracker.status()
}
