//! Delivery protocol: in-app listeners first, system notification as fallback
//!
//! One call to [`Dispatcher::handle`] is one dispatch:
//!
//! 1. Drop events without a usable payload.
//! 2. Classify; only data messages go further.
//! 3. Normalize into an `InternalPushMessage` and wrap it in an envelope.
//! 4. If backgrounded, queue the envelope for replay before broadcasting.
//! 5. Offer the envelope to the listener chain.
//! 6. Re-read the foreground flag. Unclaimed, or backgrounded at this point,
//!    means unhandled: persist the message and request a notification.
//!
//! A backgrounded app overrides a claim, so a message claimed just as the app
//! leaves the foreground may surface twice. Duplicates are preferred to loss.

use std::sync::Arc;

use core::fmt;
use rand_core::RngCore;

use crate::broadcast::{BroadcastOutcome, OrderedBroadcast};
use crate::config::PushConfig;
use crate::foreground::ForegroundState;
use crate::message::{Envelope, InboundEvent, InternalPushMessage, MessageKind};
use crate::notification::{NotificationBuilder, NotificationFactory, ResourceResolver};
use crate::pending::PendingQueue;
use crate::storage::KeyValueStore;
use crate::types::{SequenceNumber, SystemTimeSource, TimeSource};
use crate::undelivered::UndeliveredStore;
use crate::{PushError, Result};

use tracing::debug;

// ----------------------------------------------------------------------------
// Event Classification
// ----------------------------------------------------------------------------

/// Transport-side classification of inbound events
pub trait EventClassifier: Send + Sync {
    /// Failures propagate to the caller of `handle` untouched
    fn classify(&self, event: &InboundEvent) -> Result<MessageKind>;
}

/// Reads the event's own discriminator; a missing one means a data message
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscriminatorClassifier;

impl EventClassifier for DiscriminatorClassifier {
    fn classify(&self, event: &InboundEvent) -> Result<MessageKind> {
        Ok(event
            .message_type
            .as_deref()
            .map(MessageKind::from_discriminator)
            .unwrap_or(MessageKind::Data))
    }
}

// ----------------------------------------------------------------------------
// Dispatch Outcome
// ----------------------------------------------------------------------------

/// What a dispatch (or a resolution) did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Empty or missing payload; nothing happened
    Dropped,
    /// Not a data message; left for other handlers
    PassedThrough(MessageKind),
    /// An in-app listener owns the message
    Handled,
    /// Persisted and surfaced as a system notification
    Unhandled {
        sequence: SequenceNumber,
        notification_id: u32,
    },
    /// Resolution was asked about an envelope this dispatcher does not own
    Ignored,
}

impl DispatchOutcome {
    pub fn is_unhandled(&self) -> bool {
        matches!(self, DispatchOutcome::Unhandled { .. })
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchOutcome::Dropped => write!(f, "dropped"),
            DispatchOutcome::PassedThrough(kind) => write!(f, "passed through ({})", kind),
            DispatchOutcome::Handled => write!(f, "handled in-app"),
            DispatchOutcome::Unhandled {
                sequence,
                notification_id,
            } => write!(
                f,
                "unhandled: stored {} and notified (id {})",
                sequence, notification_id
            ),
            DispatchOutcome::Ignored => write!(f, "ignored"),
        }
    }
}

// ----------------------------------------------------------------------------
// Dispatcher
// ----------------------------------------------------------------------------

/// Single entry point of the delivery protocol
pub struct Dispatcher {
    message_action: String,
    notification_action: String,
    foreground: ForegroundState,
    pending: PendingQueue,
    store: Arc<UndeliveredStore>,
    classifier: Arc<dyn EventClassifier>,
    broadcaster: Arc<dyn OrderedBroadcast>,
    notifications: Arc<dyn NotificationBuilder>,
    resources: Arc<dyn ResourceResolver>,
    factory: NotificationFactory,
}

impl Dispatcher {
    /// Start building a dispatcher
    pub fn builder(config: PushConfig) -> DispatcherBuilder {
        DispatcherBuilder::new(config)
    }

    /// Run one dispatch
    pub fn handle(&self, event: &InboundEvent) -> Result<DispatchOutcome> {
        let payload = match event.usable_payload() {
            Some(payload) => payload,
            None => {
                debug!("Dropping inbound event without payload");
                return Ok(DispatchOutcome::Dropped);
            }
        };

        let kind = self.classifier.classify(event)?;
        if kind != MessageKind::Data {
            debug!(%kind, "Passing through non-data message");
            return Ok(DispatchOutcome::PassedThrough(kind));
        }

        let message = Arc::new(InternalPushMessage::from_payload(payload));
        let envelope = Envelope::new(self.message_action.clone(), message);
        debug!(envelope = %envelope.id, "Received a data message");

        if !self.foreground.is_foreground() {
            debug!(
                envelope = %envelope.id,
                "App is not in foreground, queueing envelope for replay"
            );
            self.pending.enqueue(envelope.clone());
        }

        let outcome = self.broadcaster.broadcast(&envelope);
        self.resolve(&envelope, outcome)
    }

    /// Decide a broadcast's fate. Reads the foreground flag afresh; that read
    /// is authoritative over any earlier one.
    pub fn resolve(&self, envelope: &Envelope, outcome: BroadcastOutcome) -> Result<DispatchOutcome> {
        let foreground = self.foreground.is_foreground();
        if outcome.is_claimed() && foreground {
            debug!(envelope = %envelope.id, "Envelope handled by in-app listener");
            return Ok(DispatchOutcome::Handled);
        }

        if envelope.action != self.message_action {
            debug!(
                envelope = %envelope.id,
                action = %envelope.action,
                "Ignoring unhandled envelope with foreign action"
            );
            return Ok(DispatchOutcome::Ignored);
        }

        debug!(
            envelope = %envelope.id,
            claimed = outcome.is_claimed(),
            foreground,
            "Envelope unhandled, creating a notification"
        );
        self.on_unhandled(envelope)
    }

    fn on_unhandled(&self, envelope: &Envelope) -> Result<DispatchOutcome> {
        let sequence = self.store.append_message(&envelope.message)?;

        let tap_intent = envelope.retarget(self.notification_action.clone());
        let request = self.factory.build(self.resources.as_ref(), tap_intent);
        let notification_id = request.notification_id;
        self.notifications.render(request)?;

        Ok(DispatchOutcome::Unhandled {
            sequence,
            notification_id,
        })
    }

    /// Handle to the foreground flag this dispatcher reads
    pub fn foreground(&self) -> &ForegroundState {
        &self.foreground
    }

    /// Queue of envelopes received while backgrounded
    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    /// Store of messages that fell back to a notification
    pub fn store(&self) -> &Arc<UndeliveredStore> {
        &self.store
    }
}

// ----------------------------------------------------------------------------
// Dispatcher Builder
// ----------------------------------------------------------------------------

/// Builder wiring the dispatcher to its collaborators
pub struct DispatcherBuilder {
    config: PushConfig,
    foreground: ForegroundState,
    pending: PendingQueue,
    storage: Option<Arc<dyn KeyValueStore>>,
    classifier: Arc<dyn EventClassifier>,
    broadcaster: Option<Arc<dyn OrderedBroadcast>>,
    notifications: Option<Arc<dyn NotificationBuilder>>,
    resources: Option<Arc<dyn ResourceResolver>>,
    time_source: Box<dyn TimeSource>,
    rng: Option<Box<dyn RngCore + Send>>,
}

impl DispatcherBuilder {
    /// Create a new builder
    pub fn new(config: PushConfig) -> Self {
        Self {
            config,
            foreground: ForegroundState::default(),
            pending: PendingQueue::new(),
            storage: None,
            classifier: Arc::new(DiscriminatorClassifier),
            broadcaster: None,
            notifications: None,
            resources: None,
            time_source: Box::new(SystemTimeSource::new()),
            rng: None,
        }
    }

    /// Share a foreground flag with the host application
    pub fn with_foreground(mut self, foreground: ForegroundState) -> Self {
        self.foreground = foreground;
        self
    }

    /// Share a pending queue with the replay collaborator
    pub fn with_pending_queue(mut self, pending: PendingQueue) -> Self {
        self.pending = pending;
        self
    }

    /// Key/value storage backing the undelivered store
    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn EventClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// In-app listener chain
    pub fn with_broadcast(mut self, broadcaster: Arc<dyn OrderedBroadcast>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn with_notification_builder(mut self, notifications: Arc<dyn NotificationBuilder>) -> Self {
        self.notifications = Some(notifications);
        self
    }

    pub fn with_resources(mut self, resources: Arc<dyn ResourceResolver>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn with_time_source(mut self, time_source: Box<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    /// Generator for notification ids (defaults to the OS RNG)
    pub fn with_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Validate configuration and assemble the dispatcher
    pub fn build(self) -> Result<Dispatcher> {
        self.config.validate()?;

        let storage = self
            .storage
            .ok_or_else(|| PushError::config_error("no key/value storage configured"))?;
        let broadcaster = self
            .broadcaster
            .ok_or_else(|| PushError::config_error("no listener broadcast configured"))?;
        let notifications = self
            .notifications
            .ok_or_else(|| PushError::config_error("no notification builder configured"))?;
        let resources = self
            .resources
            .ok_or_else(|| PushError::config_error("no resource resolver configured"))?;

        let factory = match self.rng {
            Some(rng) => NotificationFactory::with_rng(
                self.config.notification.clone(),
                self.time_source,
                rng,
            ),
            None => NotificationFactory::new(self.config.notification.clone(), self.time_source),
        };

        Ok(Dispatcher {
            message_action: self.config.message_action(),
            notification_action: self.config.notification_action(),
            foreground: self.foreground,
            pending: self.pending,
            store: Arc::new(UndeliveredStore::new(storage, self.config.store.clone())),
            classifier: self.classifier,
            broadcaster,
            notifications,
            resources,
            factory,
        })
    }
}
