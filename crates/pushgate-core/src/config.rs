//! Centralized Configuration Management
//!
//! Every tunable of the delivery core lives here so the host application can
//! hand a single `PushConfig` to the dispatcher, the undelivered store and the
//! dispatch worker.

use serde::{Deserialize, Serialize};

use crate::{PushError, Result};

/// Suffix of the action carried by envelopes offered to in-app listeners
pub const MESSAGE_ACTION_SUFFIX: &str = ".C2DM_MESSAGE";
/// Suffix of the action carried by the fallback notification's tap intent
pub const NOTIFICATION_ACTION_SUFFIX: &str = ".IBMPushNotification";

// ----------------------------------------------------------------------------
// Notification Configuration
// ----------------------------------------------------------------------------

/// Resource names and flags used when building fallback notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// String resource holding the notification title
    pub title_resource: String,
    /// Drawable resource holding the notification icon
    pub icon_resource: String,
    /// Built-in icon used when the icon resource is missing
    pub default_icon: String,
    /// Dismiss the notification when tapped
    pub auto_cancel: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title_resource: "push_notification_title".to_string(),
            icon_resource: "push_notification_icon".to_string(),
            default_icon: "btn_star".to_string(),
            auto_cancel: true,
        }
    }
}

// ----------------------------------------------------------------------------
// Store Configuration
// ----------------------------------------------------------------------------

/// Key layout of the undelivered message store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Preferences namespace (file name for file-backed storage)
    pub namespace: String,
    /// Key holding the current record count
    pub count_key: String,
    /// Prefix of message keys; the sequence number is appended
    pub message_key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: "com.ibm.mobile.services.push".to_string(),
            count_key: "NotificationCount".to_string(),
            message_key_prefix: "LatestNotificationMsg".to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Worker Configuration
// ----------------------------------------------------------------------------

/// Configuration for the dispatch worker thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Capacity of the inbound event channel
    pub queue_capacity: usize,
    /// Name given to the worker thread
    pub thread_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            thread_name: "push-dispatch".to_string(),
        }
    }
}

// ----------------------------------------------------------------------------
// Unified Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the push delivery core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Application package identity; prefixes every envelope action
    pub package_name: String,
    pub notification: NotificationConfig,
    pub store: StoreConfig,
    pub worker: WorkerConfig,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            package_name: "com.example.app".to_string(),
            notification: NotificationConfig::default(),
            store: StoreConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

impl PushConfig {
    /// Create a configuration for the given application package
    pub fn for_package<S: Into<String>>(package_name: S) -> Self {
        Self {
            package_name: package_name.into(),
            ..Self::default()
        }
    }

    /// Create configuration optimized for testing
    pub fn testing() -> Self {
        Self {
            package_name: "com.pushgate.test".to_string(),
            notification: NotificationConfig::default(),
            store: StoreConfig {
                namespace: "pushgate.test".to_string(),
                ..StoreConfig::default()
            },
            worker: WorkerConfig {
                queue_capacity: 8,
                thread_name: "push-dispatch-test".to_string(),
            },
        }
    }

    /// Action of envelopes offered to in-app listeners
    pub fn message_action(&self) -> String {
        format!("{}{}", self.package_name, MESSAGE_ACTION_SUFFIX)
    }

    /// Action of the intent opened when a fallback notification is tapped
    pub fn notification_action(&self) -> String {
        format!("{}{}", self.package_name, NOTIFICATION_ACTION_SUFFIX)
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<()> {
        if self.package_name.trim().is_empty() {
            return Err(PushError::config_error("package_name must not be empty"));
        }
        if self.store.count_key.is_empty() || self.store.message_key_prefix.is_empty() {
            return Err(PushError::config_error("store keys must not be empty"));
        }
        if self.store.count_key == self.store.message_key_prefix {
            return Err(PushError::config_error(
                "store count_key and message_key_prefix must differ",
            ));
        }
        if self.worker.queue_capacity == 0 {
            return Err(PushError::config_error(
                "worker queue_capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PushConfig::default().validate().is_ok());
        assert!(PushConfig::testing().validate().is_ok());
    }

    #[test]
    fn test_actions_are_prefixed_by_package() {
        let config = PushConfig::for_package("com.acme.mail");
        assert_eq!(config.message_action(), "com.acme.mail.C2DM_MESSAGE");
        assert_eq!(
            config.notification_action(),
            "com.acme.mail.IBMPushNotification"
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = PushConfig::for_package("  ");
        assert!(config.validate().is_err());

        config = PushConfig::default();
        config.store.message_key_prefix = config.store.count_key.clone();
        assert!(config.validate().is_err());

        config = PushConfig::default();
        config.worker.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: PushConfig =
            serde_json::from_str(r#"{"package_name":"com.acme","store":{"count_key":"N"}}"#)
                .unwrap();
        assert_eq!(config.package_name, "com.acme");
        assert_eq!(config.store.count_key, "N");
        assert_eq!(config.store.message_key_prefix, "LatestNotificationMsg");
        assert_eq!(config.notification, NotificationConfig::default());
    }
}
