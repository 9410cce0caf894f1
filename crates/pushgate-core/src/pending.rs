//! In-memory queue of envelopes received while the app was backgrounded
//!
//! Process-lifetime only. Cross-restart recovery is the undelivered store's
//! job; the two overlap for background dispatches and neither replaces the
//! other. Whoever re-offers queued envelopes on a foreground transition calls
//! [`PendingQueue::drain_all`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::message::Envelope;

/// Shared, ordered staging area for backgrounded envelopes
#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    inner: Arc<Mutex<VecDeque<Envelope>>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Envelope>> {
        // A panic mid-push leaves the deque intact
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an envelope at the back
    pub fn enqueue(&self, envelope: Envelope) {
        let mut queue = self.lock();
        queue.push_back(envelope);
        tracing::trace!(queued = queue.len(), "Envelope queued for replay");
    }

    /// Remove and return every queued envelope in arrival order
    pub fn drain_all(&self) -> Vec<Envelope> {
        self.lock().drain(..).collect()
    }

    /// Copy of the queued envelopes, leaving the queue untouched
    pub fn snapshot(&self) -> Vec<Envelope> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
