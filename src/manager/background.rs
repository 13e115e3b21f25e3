//! Background task spawning for sessions
//!
//! Each session gets one supervisor task that owns the session's lifecycle
//! once its responder tasks are running:
//! - watches every responder task so a crashed one still ends terminal
//! - runs the synthesis coordinator as its own task
//! - mirrors the coordinator's `Running` state as `Synthesizing`
//! - aggregates and publishes the terminal status, sealing the stream

use std::sync::Arc;

use futures::future::join_all;
use tokio::task::JoinHandle;

use super::helpers::aggregate_status;
use super::session::Session;
use crate::multiplexer::StreamMultiplexer;
use crate::synthesis::{SynthesisContext, SynthesisCoordinator};
use crate::tracker::AgentRunTracker;
use crate::types::{AgentStatus, SessionId, SessionStatus, StreamEvent};

/// Spawn the supervisor for a freshly registered session
///
/// # Arguments
/// * `session` - The registered session
/// * `runners` - Join handles of the responder tasks, same order as `session.trackers`
/// * `ctx` - Inputs for the synthesis coordinator
pub(super) fn spawn_session_supervisor(
    session: Arc<Session>,
    runners: Vec<JoinHandle<AgentStatus>>,
    ctx: SynthesisContext,
) {
    // Monitors start before the coordinator can block on a dead tracker
    let monitors: Vec<JoinHandle<AgentStatus>> = session
        .trackers
        .iter()
        .zip(runners)
        .map(|(tracker, runner)| {
            monitor_runner(
                session.id.clone(),
                Arc::clone(tracker),
                Arc::clone(&session.mux),
                runner,
            )
        })
        .collect();

    tokio::spawn(async move {
        let session_id = session.id.clone();

        let coordinator = Arc::clone(&session.coordinator);
        let mut state_rx = coordinator.subscribe_state();
        let mut coordinator_task = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.run(ctx).await }
        });

        let mut watching = true;
        let synthesis = loop {
            tokio::select! {
                biased;
                changed = state_rx.changed(), if watching => {
                    match changed {
                        Ok(()) => mark_synthesizing(&session, &coordinator),
                        Err(_) => watching = false,
                    }
                }
                joined = &mut coordinator_task => {
                    break match joined {
                        Ok(state) => state,
                        Err(e) => {
                            log::error!("[{session_id}] Synthesis task failed: {e}");
                            coordinator.fail(&session.mux, &format!("synthesis task failed: {e}"));
                            coordinator.state()
                        }
                    };
                }
            }
        };
        // Running and its terminal state may land in the same poll
        mark_synthesizing(&session, &coordinator);

        let statuses: Vec<AgentStatus> = join_all(monitors)
            .await
            .into_iter()
            .zip(&session.trackers)
            .map(|(joined, tracker)| joined.unwrap_or_else(|_| tracker.status()))
            .collect();

        let status = aggregate_status(session.cancel.is_cancelled(), &statuses, synthesis);
        session.set_status(status);
        log::info!("[{session_id}] Finished as {status:?} (synthesis {synthesis:?})");
    });
}

/// Publish `Synthesizing` once the synthesizer tracker exists
fn mark_synthesizing(session: &Session, coordinator: &SynthesisCoordinator) {
    if coordinator.tracker().is_some() && session.status() == SessionStatus::Running {
        session.set_status(SessionStatus::Synthesizing);
    }
}

/// Await one responder task, failing its tracker if the task died
fn monitor_runner(
    session_id: SessionId,
    tracker: Arc<AgentRunTracker>,
    mux: Arc<StreamMultiplexer>,
    runner: JoinHandle<AgentStatus>,
) -> JoinHandle<AgentStatus> {
    tokio::spawn(async move {
        match runner.await {
            Ok(status) => status,
            Err(e) => {
                log::error!("[{session_id}] [{}] Agent task failed: {e}", tracker.agent_id());
                let message = format!("agent task failed: {e}");
                if tracker.finish(AgentStatus::Failed, Some(message.clone())) {
                    mux.publish(StreamEvent::AgentStatus {
                        agent_id: tracker.agent_id().clone(),
                        status: AgentStatus::Failed,
                        error: Some(message),
                    });
                }
                tracker.status()
            }
        }
    })
}
