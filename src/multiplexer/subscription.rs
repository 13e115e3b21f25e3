//! Subscriber handle

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_stream::stream;
use futures::Stream;
use tokio::sync::mpsc;

use crate::error::{DebateError, Result};
use crate::types::StreamEvent;

/// One observer of a session stream
///
/// Yields the replayed backlog, then live events, then `Ok(None)` once the
/// stream is sealed. A subscriber disconnected for falling behind gets
/// everything it had already been sent, then `Err(SubscriberOverflow)`.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    backlog: VecDeque<StreamEvent>,
    live: Option<mpsc::Receiver<StreamEvent>>,
    overflowed: Arc<AtomicBool>,
}

impl Subscription {
    pub(super) fn new(
        id: u64,
        backlog: Vec<StreamEvent>,
        live: Option<mpsc::Receiver<StreamEvent>>,
        overflowed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            backlog: backlog.into(),
            live,
            overflowed,
        }
    }

    /// Subscriber id, unique within the session
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Next event, or `None` when the stream has ended
    ///
    /// # Errors
    /// Returns `SubscriberOverflow` once, after the last delivered event, if
    /// this subscriber was disconnected for falling behind
    pub async fn recv(&mut self) -> Result<Option<StreamEvent>> {
        if let Some(event) = self.backlog.pop_front() {
            return Ok(Some(event));
        }
        let Some(live) = self.live.as_mut() else {
            return Ok(None);
        };
        if let Some(event) = live.recv().await {
            return Ok(Some(event));
        }

        self.live = None;
        if self.overflowed.load(Ordering::Acquire) {
            Err(DebateError::subscriber_overflow(self.id))
        } else {
            Ok(None)
        }
    }

    /// Collect every remaining event until the stream ends
    ///
    /// # Errors
    /// Returns `SubscriberOverflow` if the subscriber was disconnected
    pub async fn collect(mut self) -> Result<Vec<StreamEvent>> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await? {
            events.push(event);
        }
        Ok(events)
    }

    /// Convert into a `Stream` of events
    pub fn into_stream(mut self) -> impl Stream<Item = Result<StreamEvent>> + Send {
        stream! {
            loop {
                match self.recv().await {
                    Ok(Some(event)) => yield Ok(event),
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }
}
