//! Ordered broadcast of envelopes to in-app listeners
//!
//! Listeners are polled synchronously in priority order; the first one to
//! claim the envelope ends the broadcast. No two listeners ever see the same
//! envelope concurrently.

use std::sync::{Arc, RwLock};

use crate::message::Envelope;

// ----------------------------------------------------------------------------
// Outcome Types
// ----------------------------------------------------------------------------

/// A listener's answer to an offered envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerVerdict {
    /// The listener takes responsibility for surfacing the message
    Claim,
    /// Pass the envelope on to the next listener
    Decline,
}

/// Result of one ordered broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOutcome {
    Claimed,
    /// The "first-unclaimed" result: nobody took the envelope
    Unclaimed,
}

impl BroadcastOutcome {
    pub fn is_claimed(&self) -> bool {
        matches!(self, BroadcastOutcome::Claimed)
    }
}

// ----------------------------------------------------------------------------
// Traits
// ----------------------------------------------------------------------------

/// In-app receiver of push envelopes
pub trait PushListener: Send + Sync {
    /// Inspect an envelope and decide whether to claim it
    fn on_message(&self, envelope: &Envelope) -> ListenerVerdict;
}

impl<F> PushListener for F
where
    F: Fn(&Envelope) -> ListenerVerdict + Send + Sync,
{
    fn on_message(&self, envelope: &Envelope) -> ListenerVerdict {
        self(envelope)
    }
}

/// Synchronous, priority-ordered offer of an envelope, stopping at first claim
pub trait OrderedBroadcast: Send + Sync {
    fn broadcast(&self, envelope: &Envelope) -> BroadcastOutcome;
}

// ----------------------------------------------------------------------------
// Listener Chain
// ----------------------------------------------------------------------------

struct Registration {
    priority: i32,
    /// Registration order; breaks priority ties
    order: u64,
    listener: Arc<dyn PushListener>,
}

/// Registry of in-app listeners implementing [`OrderedBroadcast`]
///
/// Higher priority runs first; equal priorities run in registration order.
#[derive(Default)]
pub struct ListenerChain {
    registrations: RwLock<(u64, Vec<Registration>)>,
}

impl ListenerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener at the given priority
    pub fn register(&self, priority: i32, listener: Arc<dyn PushListener>) {
        let mut guard = self
            .registrations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let (next_order, registrations) = &mut *guard;

        registrations.push(Registration {
            priority,
            order: *next_order,
            listener,
        });
        *next_order += 1;
        registrations.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.order.cmp(&b.order)));
    }

    /// Remove every registration of the given listener
    pub fn unregister(&self, listener: &Arc<dyn PushListener>) {
        let mut guard = self
            .registrations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .1
            .retain(|registration| !Arc::ptr_eq(&registration.listener, listener));
    }

    pub fn len(&self) -> usize {
        self.registrations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .1
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ordered_listeners(&self) -> Vec<Arc<dyn PushListener>> {
        self.registrations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .1
            .iter()
            .map(|registration| Arc::clone(&registration.listener))
            .collect()
    }
}

impl OrderedBroadcast for ListenerChain {
    fn broadcast(&self, envelope: &Envelope) -> BroadcastOutcome {
        // Snapshot so listeners may (un)register from inside a callback
        for (position, listener) in self.ordered_listeners().into_iter().enumerate() {
            if listener.on_message(envelope) == ListenerVerdict::Claim {
                tracing::trace!(envelope = %envelope.id, position, "Envelope claimed");
                return BroadcastOutcome::Claimed;
            }
        }
        BroadcastOutcome::Unclaimed
    }
}
