//! Event registry: per-key FIFO queues with concurrent post and bounded poll.
//!
//! The registry is an explicit, constructed object (no process-wide
//! singleton); every component that needs it holds an `Arc<EventRegistry>`.
//! Internally each `(correlation id, event name)` key owns an unbounded
//! `mpsc` channel. Posting is synchronous and lock-brief, so platform
//! dispatch threads can post without a runtime handle; polling serializes
//! consumers of one key behind that key's receiver lock without serializing
//! unrelated keys.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{timeout_at, Instant};

use crate::event::{CallbackEvent, QueueKey};

#[derive(Clone)]
struct Queue {
    tx: UnboundedSender<CallbackEvent>,
    rx: Arc<AsyncMutex<UnboundedReceiver<CallbackEvent>>>,
}

impl Queue {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(AsyncMutex::new(rx)),
        }
    }
}

/// Shared map from [`QueueKey`] to a FIFO event queue.
///
/// Queues are created implicitly on first reference, by `post` or `poll`
/// alike. They are never evicted implicitly; the owner of a correlation id
/// calls [`clear_correlation`](EventRegistry::clear_correlation) when the id
/// is finished (see the session close path in `core-service`).
#[derive(Default)]
pub struct EventRegistry {
    queues: Mutex<HashMap<QueueKey, Queue>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create the queue for `key`. The map lock is held only for the
    /// lookup; both halves of the channel are cloned out.
    fn queue(&self, key: &QueueKey) -> Queue {
        let mut map = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(key.clone()).or_insert_with(Queue::new).clone()
    }

    /// Append `event` to the queue for its key.
    ///
    /// Never blocks and never drops an event; safe to call from any thread,
    /// including platform dispatch threads with no runtime on the stack.
    pub fn post(&self, event: CallbackEvent) {
        let key = event.queue_key();
        let queue = self.queue(&key);
        tracing::trace!(key = %key, "posting event");
        if queue.tx.send(event).is_err() {
            // Only reachable when the key was cleared between the lookup and
            // the send; the clear already declared these events unwanted.
            tracing::warn!(key = %key, "discarding event posted to a cleared queue");
        }
    }

    /// Remove and return the head event for `(correlation_id, name)`, waiting
    /// up to `timeout` for one to arrive. Returns `None` on timeout.
    ///
    /// The deadline covers receiver-lock acquisition as well, so a slow
    /// concurrent consumer of the same key cannot extend the bound. A post to
    /// the key wakes the poller immediately; there is no periodic re-check.
    pub async fn poll(
        &self,
        correlation_id: &str,
        name: &str,
        timeout: Duration,
    ) -> Option<CallbackEvent> {
        let key = QueueKey::new(correlation_id, name);
        let queue = self.queue(&key);
        let deadline = Instant::now() + timeout;
        let recv = async {
            let mut rx = queue.rx.lock().await;
            rx.recv().await
        };
        match timeout_at(deadline, recv).await {
            // The sender half held in `queue` keeps the channel open, so a
            // `None` here means the key was cleared while we waited.
            Ok(event) => event,
            Err(_elapsed) => {
                tracing::trace!(key = %key, timeout_ms = timeout.as_millis() as u64, "poll timed out");
                None
            }
        }
    }

    /// Drop every queue belonging to `correlation_id`, across all event
    /// names. Returns the number of queues removed. Events still queued are
    /// discarded; concurrent pollers of those keys observe a timeout.
    pub fn clear_correlation(&self, correlation_id: &str) -> usize {
        let mut map = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        let before = map.len();
        map.retain(|key, _| key.correlation_id() != correlation_id);
        let removed = before - map.len();
        if removed > 0 {
            tracing::debug!(correlation_id, removed, "cleared event queues");
        }
        removed
    }

    /// Number of live queues, cleared keys excluded. Observability helper.
    pub fn queue_count(&self) -> usize {
        self.queues.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
