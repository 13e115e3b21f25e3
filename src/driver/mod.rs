//! Agent drivers
//!
//! An [`AgentDriver`] turns a prompt into a stream of [`DriverEvent`]s. The
//! orchestrator never looks behind this seam: browser automation, remote APIs
//! and credential handling all live inside driver implementations.
//!
//! - [`ScriptedDriver`] replays a fixed script in-process
//! - [`CommandDriver`] runs an external per-site automation program
//! - [`ProfileStore`] hands drivers their per-agent profile location
//! - [`DriverSet`] maps agent ids to drivers plus the synthesis driver

pub mod command;
pub mod profiles;
pub mod scripted;
pub mod set;

pub use command::CommandDriver;
pub use profiles::{DirProfileStore, MemoryProfileStore, ProfileStore};
pub use scripted::{ScriptStep, ScriptedDriver};
pub use set::DriverSet;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// One event produced by a driver submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// Response fragment; `is_final` marks the successful end of the run
    Chunk {
        /// Per-submission sequence number, starting at 1
        sequence: u64,
        /// Text delta
        text: String,
        /// Terminal chunk marker
        is_final: bool,
    },
    /// Terminal failure reported by the driver
    Error(String),
}

impl DriverEvent {
    /// Convenience constructor for a non-final chunk
    pub fn chunk(sequence: u64, text: impl Into<String>) -> Self {
        Self::Chunk {
            sequence,
            text: text.into(),
            is_final: false,
        }
    }

    /// Convenience constructor for a final chunk
    pub fn final_chunk(sequence: u64, text: impl Into<String>) -> Self {
        Self::Chunk {
            sequence,
            text: text.into(),
            is_final: true,
        }
    }

    /// Whether this event ends the submission
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Chunk { is_final: true, .. } | Self::Error(_))
    }
}

/// Stream returned by [`AgentDriver::submit`]
pub type DriverStream = BoxStream<'static, DriverEvent>;

/// Capability trait implemented once per target agent
///
/// Contract for `submit`:
/// - chunks arrive in increasing sequence order
/// - exactly one terminal event (final chunk or error) per submission
/// - no internal retries
/// - `cancel` firing stops the submission promptly
///
/// The orchestrator applies its own stall timeout around every stream.
pub trait AgentDriver: Send + Sync {
    /// Submit a prompt and stream the response
    fn submit(&self, prompt: String, cancel: CancellationToken) -> DriverStream;

    /// Whether the driver can currently accept prompts (e.g. is logged in)
    fn check_ready(&self) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async { Ok(true) })
    }
}
