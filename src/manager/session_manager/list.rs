//! Session listing and driver readiness

use std::sync::Arc;

use futures::future::join_all;

use crate::driver::AgentDriver;
use crate::types::{AgentId, AgentReadiness, SessionSnapshot};

use super::core::SessionManager;

impl SessionManager {
    /// Snapshots of every registered session, newest first
    pub async fn list_sessions(&self) -> Vec<SessionSnapshot> {
        let sessions: Vec<_> = self.sessions.lock().await.values().cloned().collect();
        let mut snapshots: Vec<SessionSnapshot> =
            sessions.iter().map(|session| session.snapshot()).collect();
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        snapshots
    }

    /// Ask every registered driver, synthesizer included, whether it is ready
    pub async fn check_agents(&self) -> Vec<AgentReadiness> {
        let mut drivers: Vec<(AgentId, Arc<dyn AgentDriver>)> = self
            .drivers
            .agent_ids()
            .filter_map(|agent| Some((agent.clone(), self.drivers.get(agent)?)))
            .collect();
        drivers.push((
            self.options.synthesis_agent.clone(),
            self.drivers.synthesizer(),
        ));

        join_all(drivers.into_iter().map(|(agent_id, driver)| async move {
            match driver.check_ready().await {
                Ok(ready) => AgentReadiness {
                    agent_id,
                    ready,
                    error: None,
                },
                Err(e) => {
                    log::warn!("[{agent_id}] Readiness check failed: {e}");
                    AgentReadiness {
                        agent_id,
                        ready: false,
                        error: Some(e.to_string()),
                    }
                }
            }
        }))
        .await
    }
}
