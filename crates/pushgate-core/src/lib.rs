//! Pushgate Core
//!
//! Delivery-decision core of a push-notification client. Given an inbound
//! message event and the application's foreground state, the [`Dispatcher`]
//! offers the message to in-app listeners first and falls back to a persisted,
//! user-visible notification when nobody handles it.
//!
//! Platform concerns (rendering, resource lookup, storage primitives,
//! lifecycle detection) are collaborators supplied by the host through the
//! traits re-exported below.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod broadcast;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod foreground;
pub mod message;
pub mod notification;
pub mod pending;
pub mod storage;
pub mod types;
pub mod undelivered;
pub mod worker;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use broadcast::{BroadcastOutcome, ListenerChain, ListenerVerdict, OrderedBroadcast, PushListener};
pub use config::{NotificationConfig, PushConfig, StoreConfig, WorkerConfig};
pub use dispatcher::{
    DiscriminatorClassifier, DispatchOutcome, Dispatcher, DispatcherBuilder, EventClassifier,
};
pub use errors::{
    NotificationError, PushError, PushResult, Result, StorageError, TransportError,
};
pub use foreground::ForegroundState;
pub use message::{Envelope, InboundEvent, InternalPushMessage, MessageKind, Payload};
pub use notification::{
    IconRef, NotificationBuilder, NotificationFactory, NotificationRequest, ResourceResolver,
};
pub use pending::PendingQueue;
pub use storage::{FileStorage, KeyValueStore, MemoryStorage};
pub use types::{SequenceNumber, SystemTimeSource, TimeSource, Timestamp};
pub use undelivered::{UndeliveredRecord, UndeliveredStore};
pub use worker::{DispatchHandle, DispatchWorker};
