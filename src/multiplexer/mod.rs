//! Per-session stream fan-in/fan-out
//!
//! Every event of a session goes through one [`StreamMultiplexer`]:
//!
//! - all events are appended to a replay buffer
//! - live subscribers get a non-blocking `try_send` into their bounded queue
//! - a subscriber whose queue is full is disconnected, producers never wait
//! - the terminal `session_status` event seals the stream
//!
//! The replay snapshot and live registration happen under the same lock as
//! publication, so a subscriber never sees a gap or a duplicate.

mod subscription;

pub use subscription::Subscription;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::types::{AgentId, AgentRole, ChunkEvent, SessionId, StreamEvent};

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<StreamEvent>,
    overflowed: Arc<AtomicBool>,
}

#[derive(Default)]
struct MuxInner {
    replay: Vec<StreamEvent>,
    subscribers: Vec<Subscriber>,
    closed_agents: HashSet<AgentId>,
    next_subscriber_id: u64,
    cancelled: bool,
    sealed: bool,
}

/// Ordered, replayable event stream of one session
pub struct StreamMultiplexer {
    session_id: SessionId,
    inner: Mutex<MuxInner>,
}

impl StreamMultiplexer {
    /// Create an empty multiplexer
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            inner: Mutex::new(MuxInner::default()),
        }
    }

    /// Publish a text fragment
    ///
    /// Responder chunks become `chunk` events and synthesizer chunks become
    /// `synthesis_chunk` events. Returns `false` (and drops the chunk) if the
    /// agent is already closed, the session was cancelled or the stream is
    /// sealed.
    pub fn publish_chunk(&self, role: AgentRole, chunk: &ChunkEvent) -> bool {
        let event = match role {
            AgentRole::Responder => StreamEvent::Chunk {
                agent_id: chunk.agent_id.clone(),
                sequence: chunk.sequence,
                text: chunk.text.clone(),
            },
            AgentRole::Synthesizer => StreamEvent::SynthesisChunk {
                sequence: chunk.sequence,
                text: chunk.text.clone(),
            },
        };

        let mut inner = self.inner.lock();
        if inner.cancelled {
            log::debug!(
                "[{}] Dropping chunk #{} from {} after cancellation",
                self.session_id,
                chunk.sequence,
                chunk.agent_id
            );
            return false;
        }
        if inner.closed_agents.contains(&chunk.agent_id) {
            log::debug!(
                "[{}] Dropping chunk #{} from closed agent {}",
                self.session_id,
                chunk.sequence,
                chunk.agent_id
            );
            return false;
        }
        self.dispatch(&mut inner, event)
    }

    /// Publish any event
    ///
    /// A terminal `agent_status` closes that agent; a terminal
    /// `session_status` seals the stream. Returns `false` if already sealed
    /// or if the event is a chunk for a closed agent.
    pub fn publish(&self, event: StreamEvent) -> bool {
        let mut inner = self.inner.lock();
        match &event {
            StreamEvent::Chunk { agent_id, .. }
                if inner.cancelled || inner.closed_agents.contains(agent_id) =>
            {
                return false;
            }
            StreamEvent::SynthesisChunk { .. } if inner.cancelled => return false,
            StreamEvent::AgentStatus {
                agent_id, status, ..
            } if status.is_terminal() => {
                inner.closed_agents.insert(agent_id.clone());
            }
            _ => {}
        }
        self.dispatch(&mut inner, event)
    }

    /// Reject every further chunk of the session
    ///
    /// Status events are still accepted so trackers can report `cancelled`.
    pub fn cancel(&self) {
        self.inner.lock().cancelled = true;
    }

    /// Whether [`StreamMultiplexer::cancel`] was called
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled
    }

    /// Reject further chunks from `agent_id` without publishing anything
    pub fn close_agent(&self, agent_id: &AgentId) {
        self.inner.lock().closed_agents.insert(agent_id.clone());
    }

    /// Attach an observer: full replay first, then live events
    ///
    /// `capacity` bounds the live queue; a subscriber that falls that far
    /// behind is disconnected.
    pub fn subscribe(&self, capacity: usize) -> Subscription {
        let mut inner = self.inner.lock();
        let id = inner.next_subscriber_id;
        inner.next_subscriber_id += 1;

        let backlog = inner.replay.clone();
        let overflowed = Arc::new(AtomicBool::new(false));

        let live = if inner.sealed {
            None
        } else {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            inner.subscribers.push(Subscriber {
                id,
                tx,
                overflowed: Arc::clone(&overflowed),
            });
            Some(rx)
        };

        log::debug!(
            "[{}] Subscriber {id} attached with {} replayed events",
            self.session_id,
            backlog.len()
        );
        Subscription::new(id, backlog, live, overflowed)
    }

    /// Number of attached live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Copy of every event published so far
    #[must_use]
    pub fn replay(&self) -> Vec<StreamEvent> {
        self.inner.lock().replay.clone()
    }

    /// Whether the terminal session event has been published
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.inner.lock().sealed
    }

    fn dispatch(&self, inner: &mut MuxInner, event: StreamEvent) -> bool {
        if inner.sealed {
            return false;
        }

        let seals = event.is_session_terminal();
        inner.replay.push(event.clone());

        inner.subscribers.retain(|subscriber| {
            match subscriber.tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    subscriber.overflowed.store(true, Ordering::Release);
                    log::warn!(
                        "[{}] Subscriber {} fell behind, disconnecting",
                        self.session_id,
                        subscriber.id
                    );
                    false
                }
                // Receiver dropped
                Err(TrySendError::Closed(_)) => false,
            }
        });

        if seals {
            inner.sealed = true;
            // Dropping the senders lets live subscribers drain and end
            inner.subscribers.clear();
            log::debug!("[{}] Stream sealed", self.session_id);
        }
        true
    }
}

impl std::fmt::Debug for StreamMultiplexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("StreamMultiplexer")
            .field("session_id", &self.session_id)
            .field("events", &inner.replay.len())
            .field("subscribers", &inner.subscribers.len())
            .field("sealed", &inner.sealed)
            .finish()
    }
}
