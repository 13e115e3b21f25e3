//! Synthesis over the responders' answers
//!
//! - [`policy`] - when the synthesizer may start
//! - [`prompt`] - deterministic meta-prompt construction
//! - [`coordinator`] - the coordinator state machine

pub mod coordinator;
pub mod policy;
pub mod prompt;

pub use coordinator::{SynthesisContext, SynthesisCoordinator};
pub use policy::{CompletionPolicy, PolicyDecision};
pub use prompt::build_meta_prompt;
