//! # Multi-agent debate orchestrator
//!
//! Queries several independent conversational agents concurrently, streams
//! their partial answers live to any number of observers, and once enough of
//! them have finished, runs a synthesis pass over the successful answers that
//! is streamed the same way.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use kodegen_debate::{AgentId, OrchestratorOptions, SessionManager};
//! use kodegen_debate::driver::{DriverSet, ScriptedDriver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let drivers = DriverSet::new(Arc::new(ScriptedDriver::replying(
//!         Duration::from_millis(10),
//!         "## Consensus Points\nBoth say 4.",
//!     )))
//!     .with_agent("claude", Arc::new(ScriptedDriver::replying(Duration::from_millis(30), "4")))
//!     .with_agent("gemini", Arc::new(ScriptedDriver::replying(Duration::from_millis(50), "four")));
//!
//!     let manager = SessionManager::new(drivers, OrchestratorOptions::default());
//!     let session_id = manager
//!         .start_session("What is 2 + 2?", vec![AgentId::from("claude"), AgentId::from("gemini")])
//!         .await?;
//!
//!     let mut subscription = manager.subscribe(&session_id).await?;
//!     while let Some(event) = subscription.recv().await? {
//!         log::info!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Components
//!
//! - [`driver`] - the [`AgentDriver`] seam and its scripted/subprocess variants
//! - [`tracker`] - per-agent run state and the task that drives it
//! - [`multiplexer`] - replayable per-session fan-in/fan-out
//! - [`synthesis`] - completion policy, meta-prompt and coordinator
//! - [`manager`] - the [`SessionManager`] and its session registry
//! - `gateway` - axum WebSocket gateway (feature `server`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod driver;
pub mod error;
pub mod manager;
pub mod multiplexer;
pub mod registry;
pub mod synthesis;
pub mod tracker;
pub mod types;

#[cfg(feature = "server")]
pub mod gateway;

// Re-export commonly used types for external API
pub use driver::{AgentDriver, DriverEvent, DriverSet, DriverStream};
pub use error::{DebateError, Result};
pub use manager::SessionManager;
pub use multiplexer::{StreamMultiplexer, Subscription};
pub use registry::ConnectionRegistry;
pub use synthesis::{CompletionPolicy, SynthesisCoordinator};
pub use tracker::AgentRunTracker;

// Re-export type submodules for flat public API
pub use types::events::{ChunkEvent, StreamEvent};
pub use types::identifiers::{AgentId, SessionId};
pub use types::options::{OrchestratorOptions, OrchestratorOptionsBuilder};
pub use types::snapshot::{
    AgentOutputPage, AgentReadiness, AgentSnapshot, SessionSnapshot, SynthesisSnapshot,
};
pub use types::status::{AgentRole, AgentStatus, SessionStatus, SynthesisState};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
