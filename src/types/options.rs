//! Orchestrator options and configuration
//!
//! This module contains the configuration for the session manager, with a
//! builder for programmatic setup and an environment overlay for the server
//! binary.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::{DebateError, Result};
use crate::synthesis::CompletionPolicy;

use super::identifiers::AgentId;

/// Default per-agent stall window (no chunk for this long => `TimedOut`)
pub const DEFAULT_STALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Default bound for one subscriber's outbound queue, in events
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1024;

/// Default retention for terminal sessions before eviction
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(60);

/// Default interval of the eviction task
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Default time `shutdown` waits for cancelled sessions to settle
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Agents queried when a start request names none
pub const DEFAULT_AGENTS: &[&str] = &["claude", "chatgpt", "gemini"];

/// Identifier of the synthesizer tracker
pub const DEFAULT_SYNTHESIS_AGENT: &str = "synthesis";

// ============================================================================
// Orchestrator Options
// ============================================================================

/// Main options for the session manager
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Per-agent stall window, measured from start and from each chunk
    pub stall_timeout: Duration,
    /// Stall windows overriding `stall_timeout` for individual agents
    pub agent_stall_timeouts: HashMap<AgentId, Duration>,
    /// Optional overall deadline for one agent run
    pub max_duration: Option<Duration>,
    /// How long `shutdown` waits for cancelled sessions to become terminal
    pub cancel_grace: Duration,
    /// Bound of each subscriber's outbound queue
    pub subscriber_capacity: usize,
    /// How long terminal sessions stay readable before eviction
    pub retention: Duration,
    /// How often the eviction task runs
    pub cleanup_interval: Duration,
    /// When synthesis is allowed to start
    pub completion_policy: CompletionPolicy,
    /// Agents queried by `start_default_session`
    pub default_agents: Vec<AgentId>,
    /// Identifier given to the synthesizer tracker
    pub synthesis_agent: AgentId,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            stall_timeout: DEFAULT_STALL_TIMEOUT,
            agent_stall_timeouts: HashMap::new(),
            max_duration: None,
            cancel_grace: DEFAULT_CANCEL_GRACE,
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            retention: DEFAULT_RETENTION,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            completion_policy: CompletionPolicy::default(),
            default_agents: DEFAULT_AGENTS.iter().copied().map(AgentId::from).collect(),
            synthesis_agent: AgentId::from(DEFAULT_SYNTHESIS_AGENT),
        }
    }
}

impl OrchestratorOptions {
    /// Create a new builder for `OrchestratorOptions`
    #[must_use]
    pub fn builder() -> OrchestratorOptionsBuilder {
        OrchestratorOptionsBuilder::default()
    }

    /// Defaults overlaid with `DEBATE_*` environment variables
    ///
    /// # Errors
    /// Returns `InvalidConfig` if a variable is present but malformed
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from an arbitrary key lookup
    ///
    /// Recognised keys:
    /// - `DEBATE_STALL_TIMEOUT_SECS`
    /// - `DEBATE_AGENT_STALL_TIMEOUTS` (`agent=secs` pairs, comma separated)
    /// - `DEBATE_MAX_DURATION_SECS`
    /// - `DEBATE_CANCEL_GRACE_SECS`
    /// - `DEBATE_SUBSCRIBER_CAPACITY`
    /// - `DEBATE_RETENTION_SECS`
    /// - `DEBATE_CLEANUP_INTERVAL_SECS`
    /// - `DEBATE_COMPLETION_POLICY` (`all`, `any` or `majority`)
    /// - `DEBATE_AGENTS` (comma separated)
    /// - `DEBATE_SYNTHESIS_AGENT`
    ///
    /// # Errors
    /// Returns `InvalidConfig` if a value cannot be parsed
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::default();

        if let Some(secs) = parse_number(&lookup, "DEBATE_STALL_TIMEOUT_SECS")? {
            options.stall_timeout = Duration::from_secs(secs);
        }
        if let Some(pairs) = lookup("DEBATE_AGENT_STALL_TIMEOUTS") {
            options.agent_stall_timeouts = parse_agent_timeouts(&pairs)?;
        }
        if let Some(secs) = parse_number(&lookup, "DEBATE_MAX_DURATION_SECS")? {
            options.max_duration = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_number(&lookup, "DEBATE_CANCEL_GRACE_SECS")? {
            options.cancel_grace = Duration::from_secs(secs);
        }
        if let Some(capacity) = parse_number(&lookup, "DEBATE_SUBSCRIBER_CAPACITY")? {
            options.subscriber_capacity = usize::try_from(capacity).map_err(|_| {
                DebateError::invalid_config("DEBATE_SUBSCRIBER_CAPACITY is out of range")
            })?;
        }
        if let Some(secs) = parse_number(&lookup, "DEBATE_RETENTION_SECS")? {
            options.retention = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_number(&lookup, "DEBATE_CLEANUP_INTERVAL_SECS")? {
            options.cleanup_interval = Duration::from_secs(secs);
        }
        if let Some(policy) = lookup("DEBATE_COMPLETION_POLICY") {
            options.completion_policy = policy.parse()?;
        }
        if let Some(agents) = lookup("DEBATE_AGENTS") {
            options.default_agents = agents
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(AgentId::from)
                .collect();
        }
        if let Some(agent) = lookup("DEBATE_SYNTHESIS_AGENT") {
            options.synthesis_agent = AgentId::from(agent.trim());
        }

        options.validate()?;
        Ok(options)
    }

    /// Stall window for one agent, its override if configured
    #[must_use]
    pub fn stall_timeout_for(&self, agent: &AgentId) -> Duration {
        self.agent_stall_timeouts
            .get(agent)
            .copied()
            .unwrap_or(self.stall_timeout)
    }

    /// Check internal consistency
    ///
    /// # Errors
    /// Returns `InvalidConfig` for zero-sized windows or queues
    pub fn validate(&self) -> Result<()> {
        if self.stall_timeout.is_zero() {
            return Err(DebateError::invalid_config("stall timeout must be non-zero"));
        }
        if let Some((agent, _)) = self
            .agent_stall_timeouts
            .iter()
            .find(|(_, timeout)| timeout.is_zero())
        {
            return Err(DebateError::invalid_config(format!(
                "stall timeout for {agent} must be non-zero"
            )));
        }
        if self.subscriber_capacity == 0 {
            return Err(DebateError::invalid_config(
                "subscriber capacity must be at least 1",
            ));
        }
        if self.cleanup_interval.is_zero() {
            return Err(DebateError::invalid_config(
                "cleanup interval must be non-zero",
            ));
        }
        Ok(())
    }
}

fn parse_number(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<u64>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map_err(|e| DebateError::invalid_config(format!("{key}={raw:?}: {e}")))
        })
        .transpose()
}

fn parse_agent_timeouts(raw: &str) -> Result<HashMap<AgentId, Duration>> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (agent, secs) = pair.split_once('=').ok_or_else(|| {
                DebateError::invalid_config(format!(
                    "DEBATE_AGENT_STALL_TIMEOUTS entry {pair:?} is not agent=secs"
                ))
            })?;
            let secs = secs.trim().parse::<u64>().map_err(|e| {
                DebateError::invalid_config(format!("DEBATE_AGENT_STALL_TIMEOUTS {pair:?}: {e}"))
            })?;
            Ok((AgentId::from(agent.trim()), Duration::from_secs(secs)))
        })
        .collect()
}

// ============================================================================
// Builder for OrchestratorOptions
// ============================================================================

/// Builder for `OrchestratorOptions`
#[derive(Debug, Default)]
pub struct OrchestratorOptionsBuilder {
    options: OrchestratorOptions,
}

impl OrchestratorOptionsBuilder {
    /// Set the per-agent stall window
    #[must_use]
    pub const fn stall_timeout(mut self, timeout: Duration) -> Self {
        self.options.stall_timeout = timeout;
        self
    }

    /// Override the stall window for one agent
    #[must_use]
    pub fn agent_stall_timeout(mut self, agent: impl Into<AgentId>, timeout: Duration) -> Self {
        self.options.agent_stall_timeouts.insert(agent.into(), timeout);
        self
    }

    /// Set an overall deadline for each agent run
    #[must_use]
    pub const fn max_duration(mut self, deadline: Duration) -> Self {
        self.options.max_duration = Some(deadline);
        self
    }

    /// Set the shutdown grace period
    #[must_use]
    pub const fn cancel_grace(mut self, grace: Duration) -> Self {
        self.options.cancel_grace = grace;
        self
    }

    /// Set the per-subscriber queue bound
    #[must_use]
    pub const fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.options.subscriber_capacity = capacity;
        self
    }

    /// Set how long terminal sessions are retained
    #[must_use]
    pub const fn retention(mut self, retention: Duration) -> Self {
        self.options.retention = retention;
        self
    }

    /// Set the eviction task interval
    #[must_use]
    pub const fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.options.cleanup_interval = interval;
        self
    }

    /// Set the synthesis completion policy
    #[must_use]
    pub const fn completion_policy(mut self, policy: CompletionPolicy) -> Self {
        self.options.completion_policy = policy;
        self
    }

    /// Set the default agent list
    #[must_use]
    pub fn default_agents(mut self, agents: Vec<impl Into<AgentId>>) -> Self {
        self.options.default_agents = agents.into_iter().map(Into::into).collect();
        self
    }

    /// Set the synthesizer tracker identifier
    #[must_use]
    pub fn synthesis_agent(mut self, agent: impl Into<AgentId>) -> Self {
        self.options.synthesis_agent = agent.into();
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> OrchestratorOptions {
        self.options
    }
}
