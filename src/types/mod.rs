//! Type definitions for the debate orchestrator
//!
//! - [`identifiers`] - Type-safe ID wrappers (`SessionId`, `AgentId`)
//! - [`status`] - Agent, synthesis and session status enums
//! - [`events`] - Chunk events and the public stream contract
//! - [`snapshot`] - Point-in-time views returned by the session manager
//! - [`options`] - Orchestrator configuration

pub mod events;
pub mod identifiers;
pub mod options;
pub mod snapshot;
pub mod status;

// Re-export commonly used types
pub use events::{ChunkEvent, StreamEvent};
pub use identifiers::{AgentId, SessionId};
pub use options::{OrchestratorOptions, OrchestratorOptionsBuilder};
pub use snapshot::{
    AgentOutputPage, AgentReadiness, AgentSnapshot, SessionSnapshot, SynthesisSnapshot,
};
pub use status::{AgentRole, AgentStatus, SessionStatus, SynthesisState};
