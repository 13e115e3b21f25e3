//! Keyed per-agent profile locations
//!
//! Site drivers keep their logged-in browser state in a directory per agent.
//! The orchestrator never touches this store; whoever constructs the drivers
//! owns its init/teardown lifecycle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::error::Result;
use crate::types::AgentId;

/// Lookup of an agent's persisted profile location
pub trait ProfileStore: Send + Sync {
    /// Directory holding the agent's profile, if one is configured
    fn profile_dir(&self, agent: &AgentId) -> Option<PathBuf>;
}

/// Profiles laid out as `<root>/<agent_id>`
#[derive(Debug, Clone)]
pub struct DirProfileStore {
    root: PathBuf,
}

impl DirProfileStore {
    /// Create a store rooted at `root` (nothing is created yet)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the profile directories for `agents`
    ///
    /// # Errors
    /// Returns an IO error if a directory cannot be created
    pub fn init<'a>(&self, agents: impl IntoIterator<Item = &'a AgentId>) -> Result<()> {
        for agent in agents {
            let dir = self.root.join(agent.as_str());
            std::fs::create_dir_all(&dir)?;
            log::debug!("Profile directory ready for {agent}: {}", dir.display());
        }
        Ok(())
    }

    /// Remove one agent's profile, logging it out
    ///
    /// # Errors
    /// Returns an IO error if the directory exists but cannot be removed
    pub fn clear(&self, agent: &AgentId) -> Result<()> {
        let dir = self.root.join(agent.as_str());
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
            log::info!("Cleared profile for {agent}");
        }
        Ok(())
    }
}

impl ProfileStore for DirProfileStore {
    fn profile_dir(&self, agent: &AgentId) -> Option<PathBuf> {
        let dir = self.root.join(agent.as_str());
        dir.is_dir().then_some(dir)
    }
}

/// In-memory mapping, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    entries: RwLock<HashMap<AgentId, PathBuf>>,
}

impl MemoryProfileStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an agent's profile location
    pub fn insert(&self, agent: impl Into<AgentId>, dir: impl Into<PathBuf>) {
        self.entries.write().insert(agent.into(), dir.into());
    }

    /// Forget an agent's profile location
    pub fn remove(&self, agent: &AgentId) -> Option<PathBuf> {
        self.entries.write().remove(agent)
    }
}

impl ProfileStore for MemoryProfileStore {
    fn profile_dir(&self, agent: &AgentId) -> Option<PathBuf> {
        self.entries.read().get(agent).cloned()
    }
}
