//! Message types flowing through the delivery pipeline
//!
//! An [`InboundEvent`] arrives from the transport, is normalized once into an
//! [`InternalPushMessage`], and travels inside an [`Envelope`] to in-app
//! listeners, the pending queue, and (when unhandled) the fallback
//! notification's tap intent.

use std::collections::BTreeMap;
use std::sync::Arc;

use core::fmt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Result;

/// Key/value bundle as delivered by the transport
pub type Payload = BTreeMap<String, String>;

/// Payload keys read when normalizing a message
pub mod keys {
    pub const ALERT: &str = "alert";
    pub const ID: &str = "nid";
    pub const URL: &str = "url";
}

// ----------------------------------------------------------------------------
// Inbound Event
// ----------------------------------------------------------------------------

/// Raw event handed over by the transport
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Transport-supplied discriminator; interpreted only by the classifier
    #[serde(default)]
    pub message_type: Option<String>,
    /// Message payload. `None` when the transport could not decode one.
    #[serde(default)]
    pub payload: Option<Payload>,
}

impl InboundEvent {
    /// Create an event carrying a data payload
    pub fn new(payload: Payload) -> Self {
        Self {
            message_type: None,
            payload: Some(payload),
        }
    }

    /// Attach an explicit message-type discriminator
    pub fn with_message_type<S: Into<String>>(mut self, message_type: S) -> Self {
        self.message_type = Some(message_type.into());
        self
    }

    /// Event payload, if present and non-empty
    pub fn usable_payload(&self) -> Option<&Payload> {
        self.payload.as_ref().filter(|payload| !payload.is_empty())
    }
}

// ----------------------------------------------------------------------------
// Message Classification
// ----------------------------------------------------------------------------

/// Classification of an inbound event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// A regular data message; the only kind the dispatcher delivers
    Data,
    /// Upstream send failure report
    SendError,
    /// Server dropped pending messages for this device
    DeletedMessages,
    /// Upstream send acknowledgement
    SendEvent,
    /// Unrecognized discriminator
    Other(String),
}

impl MessageKind {
    /// Map a transport discriminator to a message kind
    pub fn from_discriminator(discriminator: &str) -> Self {
        match discriminator {
            "gcm" => MessageKind::Data,
            "send_error" => MessageKind::SendError,
            "deleted_messages" => MessageKind::DeletedMessages,
            "send_event" => MessageKind::SendEvent,
            other => MessageKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Data => write!(f, "data"),
            MessageKind::SendError => write!(f, "send_error"),
            MessageKind::DeletedMessages => write!(f, "deleted_messages"),
            MessageKind::SendEvent => write!(f, "send_event"),
            MessageKind::Other(other) => write!(f, "other({})", other),
        }
    }
}

// ----------------------------------------------------------------------------
// Internal Push Message
// ----------------------------------------------------------------------------

/// Normalized, immutable representation of a push message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalPushMessage {
    /// Server-assigned message id, when supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Text shown to the user
    pub alert: String,
    /// Deep link attached by the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// The full payload as received
    #[serde(default)]
    pub payload: Payload,
}

impl InternalPushMessage {
    /// Normalize a transport payload. A missing alert becomes empty text.
    pub fn from_payload(payload: &Payload) -> Self {
        Self {
            id: payload.get(keys::ID).cloned(),
            alert: payload.get(keys::ALERT).cloned().unwrap_or_default(),
            url: payload.get(keys::URL).cloned(),
            payload: payload.clone(),
        }
    }

    /// Serialize to the JSON text form used for persistence
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the JSON text form
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ----------------------------------------------------------------------------
// Envelope
// ----------------------------------------------------------------------------

/// Tagged wrapper offered to listeners and queued for replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Correlates log lines of one dispatch
    pub id: Uuid,
    /// Application-scoped action, e.g. `com.acme.C2DM_MESSAGE`
    pub action: String,
    /// The wrapped message, shared read-only with listeners
    pub message: Arc<InternalPushMessage>,
}

impl Envelope {
    /// Wrap a message under the given action
    pub fn new<S: Into<String>>(action: S, message: Arc<InternalPushMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: action.into(),
            message,
        }
    }

    /// Re-wrap the same message under another action
    pub fn retarget<S: Into<String>>(&self, action: S) -> Self {
        Self::new(action, Arc::clone(&self.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(entries: &[(&str, &str)]) -> Payload {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_message_normalization() {
        let raw = payload(&[("alert", "Hello"), ("nid", "42"), ("extra", "x")]);
        let message = InternalPushMessage::from_payload(&raw);
        assert_eq!(message.alert, "Hello");
        assert_eq!(message.id.as_deref(), Some("42"));
        assert_eq!(message.url, None);
        assert_eq!(message.payload.get("extra").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_missing_alert_is_empty() {
        let message = InternalPushMessage::from_payload(&payload(&[("badge", "3")]));
        assert_eq!(message.alert, "");
    }

    #[test]
    fn test_json_form_preserves_payload() {
        let message =
            InternalPushMessage::from_payload(&payload(&[("alert", "Hi"), ("url", "app://x")]));
        let json = message.to_json().unwrap();
        assert!(json.contains("\"alert\":\"Hi\""));
        assert_eq!(InternalPushMessage::from_json(&json).unwrap(), message);
    }

    #[test]
    fn test_usable_payload() {
        assert!(InboundEvent::default().usable_payload().is_none());
        assert!(InboundEvent::new(Payload::new()).usable_payload().is_none());
        assert!(InboundEvent::new(payload(&[("alert", "a")]))
            .usable_payload()
            .is_some());
    }

    #[test]
    fn test_discriminator_mapping() {
        assert_eq!(MessageKind::from_discriminator("gcm"), MessageKind::Data);
        assert_eq!(
            MessageKind::from_discriminator("deleted_messages"),
            MessageKind::DeletedMessages
        );
        assert_eq!(
            MessageKind::from_discriminator("ping"),
            MessageKind::Other("ping".to_string())
        );
    }

    #[test]
    fn test_retarget_shares_message() {
        let message = Arc::new(InternalPushMessage::from_payload(&payload(&[("alert", "a")])));
        let envelope = Envelope::new("a.C2DM_MESSAGE", Arc::clone(&message));
        let tap = envelope.retarget("a.IBMPushNotification");
        assert!(Arc::ptr_eq(&envelope.message, &tap.message));
        assert_ne!(envelope.id, tap.id);
    }
}
