//! In-process driver that replays a fixed script
//!
//! Useful for demos and for exercising the orchestrator deterministically
//! under `tokio::time::pause`.

use std::time::Duration;

use async_stream::stream;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::{AgentDriver, DriverEvent, DriverStream};
use crate::error::Result;

/// One step of a script; each delay is relative to the previous step
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Emit a non-final chunk
    Chunk {
        /// Wait before emitting
        delay: Duration,
        /// Text delta
        text: String,
    },
    /// Emit the final chunk
    Final {
        /// Wait before emitting
        delay: Duration,
        /// Text delta
        text: String,
    },
    /// Report a driver error
    Error {
        /// Wait before emitting
        delay: Duration,
        /// Error message
        message: String,
    },
    /// Emit an arbitrary event, sequence number included
    Raw {
        /// Wait before emitting
        delay: Duration,
        /// Event to emit verbatim
        event: DriverEvent,
    },
    /// Produce nothing until cancelled
    Stall,
}

impl ScriptStep {
    const fn delay(&self) -> Duration {
        match self {
            Self::Chunk { delay, .. }
            | Self::Final { delay, .. }
            | Self::Error { delay, .. }
            | Self::Raw { delay, .. } => *delay,
            Self::Stall => Duration::ZERO,
        }
    }
}

/// Driver replaying a [`ScriptStep`] list on every submission
///
/// Sequence numbers for `Chunk`/`Final` steps are assigned from 1 upward.
/// A script that runs out without a terminal step simply ends the stream.
#[derive(Debug)]
pub struct ScriptedDriver {
    steps: Vec<ScriptStep>,
    ready: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedDriver {
    /// Create a driver with an empty script
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            ready: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Driver that answers with a single final chunk after `delay`
    pub fn replying(delay: Duration, text: impl Into<String>) -> Self {
        Self::new().final_chunk(delay, text)
    }

    /// Driver that stalls until cancelled
    #[must_use]
    pub fn stalling() -> Self {
        Self::new().stall()
    }

    /// Append a non-final chunk
    #[must_use]
    pub fn chunk(mut self, delay: Duration, text: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::Chunk {
            delay,
            text: text.into(),
        });
        self
    }

    /// Append the final chunk
    #[must_use]
    pub fn final_chunk(mut self, delay: Duration, text: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::Final {
            delay,
            text: text.into(),
        });
        self
    }

    /// Append a driver error
    #[must_use]
    pub fn error(mut self, delay: Duration, message: impl Into<String>) -> Self {
        self.steps.push(ScriptStep::Error {
            delay,
            message: message.into(),
        });
        self
    }

    /// Append an arbitrary event
    #[must_use]
    pub fn event(mut self, delay: Duration, event: DriverEvent) -> Self {
        self.steps.push(ScriptStep::Raw { delay, event });
        self
    }

    /// Append a stall
    #[must_use]
    pub fn stall(mut self) -> Self {
        self.steps.push(ScriptStep::Stall);
        self
    }

    /// Make `check_ready` report `false`
    #[must_use]
    pub fn unready(mut self) -> Self {
        self.ready = false;
        self
    }

    /// Prompts submitted so far, in submission order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentDriver for ScriptedDriver {
    fn submit(&self, prompt: String, cancel: CancellationToken) -> DriverStream {
        self.prompts.lock().push(prompt);
        let steps = self.steps.clone();

        Box::pin(stream! {
            let mut sequence = 0u64;
            for step in steps {
                let delay = step.delay();
                if !delay.is_zero() {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }

                match step {
                    ScriptStep::Chunk { text, .. } => {
                        sequence += 1;
                        yield DriverEvent::chunk(sequence, text);
                    }
                    ScriptStep::Final { text, .. } => {
                        sequence += 1;
                        yield DriverEvent::final_chunk(sequence, text);
                        break;
                    }
                    ScriptStep::Error { message, .. } => {
                        yield DriverEvent::Error(message);
                        break;
                    }
                    ScriptStep::Raw { event, .. } => {
                        if let DriverEvent::Chunk { sequence: seq, .. } = &event {
                            sequence = *seq;
                        }
                        yield event;
                    }
                    ScriptStep::Stall => {
                        cancel.cancelled().await;
                        break;
                    }
                }
            }
        })
    }

    fn check_ready(&self) -> BoxFuture<'_, Result<bool>> {
        let ready = self.ready;
        Box::pin(async move { Ok(ready) })
    }
}
