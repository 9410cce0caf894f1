//! Error types for the pushgate delivery core
//!
//! This module contains all error types used by the dispatcher and its
//! collaborators: transport classification errors, storage errors,
//! notification rendering errors, and the PushError type that unifies them.

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Failures raised by the inbound event source while classifying an event
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Message type classification failed: {reason}")]
    ClassificationFailed { reason: String },
}

/// Failures of the persistent key/value storage backing the undelivered store
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage not available: {reason}")]
    Unavailable { reason: String },
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt record under key {key}: {reason}")]
    CorruptRecord { key: String, reason: String },
}

/// Failures reported by the fallback notification builder
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification rejected: {reason}")]
    Rejected { reason: String },
    #[error("Notification renderer unavailable")]
    RendererUnavailable,
}

// ----------------------------------------------------------------------------
// Unified Error Type
// ----------------------------------------------------------------------------

/// Core error type for the push delivery pipeline
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    /// Dispatch worker channel closed or dropped its reply
    #[error("Channel error: {message}")]
    Channel { message: String },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl PushError {
    /// Create a channel error with a message
    pub fn channel_error<T: Into<String>>(message: T) -> Self {
        PushError::Channel {
            message: message.into(),
        }
    }

    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        PushError::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a storage unavailable error with a reason
    pub fn storage_error<T: Into<String>>(reason: T) -> Self {
        PushError::Storage(StorageError::Unavailable {
            reason: reason.into(),
        })
    }

    /// Create a corrupt record error for a storage key
    pub fn corrupt_record<K: Into<String>, R: Into<String>>(key: K, reason: R) -> Self {
        PushError::Storage(StorageError::CorruptRecord {
            key: key.into(),
            reason: reason.into(),
        })
    }

    /// Create a classification failure error
    pub fn classification_failed<T: Into<String>>(reason: T) -> Self {
        PushError::Transport(TransportError::ClassificationFailed {
            reason: reason.into(),
        })
    }

    /// Create a notification rejected error
    pub fn notification_rejected<T: Into<String>>(reason: T) -> Self {
        PushError::Notification(NotificationError::Rejected {
            reason: reason.into(),
        })
    }

    /// Create a renderer unavailable error
    pub fn renderer_unavailable() -> Self {
        PushError::Notification(NotificationError::RendererUnavailable)
    }

    /// Whether this error originated from the inbound transport
    pub fn is_transport(&self) -> bool {
        matches!(self, PushError::Transport(_))
    }
}

impl From<std::io::Error> for PushError {
    fn from(err: std::io::Error) -> Self {
        PushError::Storage(StorageError::Io(err))
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, PushError>;
pub type PushResult<T> = Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_map_to_variants() {
        assert!(PushError::classification_failed("gcm down").is_transport());
        assert!(matches!(
            PushError::corrupt_record("NotificationCount", "not a number"),
            PushError::Storage(StorageError::CorruptRecord { .. })
        ));
        assert!(!PushError::config_error("empty package").is_transport());
        assert!(matches!(
            PushError::renderer_unavailable(),
            PushError::Notification(NotificationError::RendererUnavailable)
        ));
    }

    #[test]
    fn test_display_includes_reason() {
        let err = PushError::storage_error("read-only volume");
        assert_eq!(
            err.to_string(),
            "Storage error: Storage not available: read-only volume"
        );
    }
}
