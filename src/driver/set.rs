//! Registered drivers for a session manager

use std::collections::BTreeMap;
use std::sync::Arc;

use super::AgentDriver;
use crate::types::AgentId;

/// Responder drivers keyed by agent id, plus the designated synthesis driver
#[derive(Clone)]
pub struct DriverSet {
    agents: BTreeMap<AgentId, Arc<dyn AgentDriver>>,
    synthesizer: Arc<dyn AgentDriver>,
}

impl DriverSet {
    /// Create a set with only a synthesis driver
    pub fn new(synthesizer: Arc<dyn AgentDriver>) -> Self {
        Self {
            agents: BTreeMap::new(),
            synthesizer,
        }
    }

    /// Register a responder driver
    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<AgentId>, driver: Arc<dyn AgentDriver>) -> Self {
        self.agents.insert(agent.into(), driver);
        self
    }

    /// Register a responder driver in place
    pub fn insert(&mut self, agent: impl Into<AgentId>, driver: Arc<dyn AgentDriver>) {
        self.agents.insert(agent.into(), driver);
    }

    /// Driver for a responder
    #[must_use]
    pub fn get(&self, agent: &AgentId) -> Option<Arc<dyn AgentDriver>> {
        self.agents.get(agent).cloned()
    }

    /// Whether a responder driver is registered
    #[must_use]
    pub fn contains(&self, agent: &AgentId) -> bool {
        self.agents.contains_key(agent)
    }

    /// The synthesis driver
    #[must_use]
    pub fn synthesizer(&self) -> Arc<dyn AgentDriver> {
        Arc::clone(&self.synthesizer)
    }

    /// Registered responder ids, sorted
    pub fn agent_ids(&self) -> impl Iterator<Item = &AgentId> {
        self.agents.keys()
    }
}

impl std::fmt::Debug for DriverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverSet")
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
