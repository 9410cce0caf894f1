//! Fallback notification requests
//!
//! The core never renders anything. It assembles a [`NotificationRequest`]
//! from the unhandled message plus the resolved title and icon, and hands it
//! to the host's [`NotificationBuilder`].

use std::sync::Mutex;

use core::fmt;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::config::NotificationConfig;
use crate::message::Envelope;
use crate::types::{TimeSource, Timestamp};
use crate::Result;

// ----------------------------------------------------------------------------
// Request Types
// ----------------------------------------------------------------------------

/// Reference to an icon in the host application's resources
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IconRef {
    /// Icon shipped with the application
    Resource(String),
    /// Platform built-in icon
    BuiltIn(String),
}

impl fmt::Display for IconRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IconRef::Resource(name) => write!(f, "drawable/{}", name),
            IconRef::BuiltIn(name) => write!(f, "builtin/{}", name),
        }
    }
}

/// Everything the host needs to render one fallback notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    /// Random id; distinct notifications do not replace each other
    pub notification_id: u32,
    pub ticker: String,
    pub title: String,
    pub body: String,
    pub icon: IconRef,
    pub when: Timestamp,
    pub auto_cancel: bool,
    /// Opened when the user taps the notification
    pub tap_intent: Envelope,
}

// ----------------------------------------------------------------------------
// Collaborator Traits
// ----------------------------------------------------------------------------

/// Host-side notification renderer
pub trait NotificationBuilder: Send + Sync {
    fn render(&self, request: NotificationRequest) -> Result<()>;
}

/// Lookup of host application resources
pub trait ResourceResolver: Send + Sync {
    /// Value of a string resource, if defined
    fn string_resource(&self, name: &str) -> Option<String>;

    /// Whether a drawable resource with this name exists
    fn has_drawable(&self, name: &str) -> bool;

    /// Application display name, if available
    fn application_label(&self) -> Option<String>;
}

// ----------------------------------------------------------------------------
// Resolution
// ----------------------------------------------------------------------------

/// Title resource, then application label, then empty
pub fn resolve_title(resolver: &dyn ResourceResolver, config: &NotificationConfig) -> String {
    if let Some(title) = resolver.string_resource(&config.title_resource) {
        return title;
    }
    match resolver.application_label() {
        Some(label) => label,
        None => {
            tracing::warn!(
                "Notification will not have a title because application name is not available"
            );
            String::new()
        }
    }
}

/// Icon resource, else the configured built-in icon
pub fn resolve_icon(resolver: &dyn ResourceResolver, config: &NotificationConfig) -> IconRef {
    if resolver.has_drawable(&config.icon_resource) {
        IconRef::Resource(config.icon_resource.clone())
    } else {
        IconRef::BuiltIn(config.default_icon.clone())
    }
}

// ----------------------------------------------------------------------------
// Request Factory
// ----------------------------------------------------------------------------

/// Assembles notification requests for unhandled messages
pub struct NotificationFactory {
    config: NotificationConfig,
    time_source: Box<dyn TimeSource>,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl NotificationFactory {
    /// Factory using the OS random source for notification ids
    pub fn new(config: NotificationConfig, time_source: Box<dyn TimeSource>) -> Self {
        Self::with_rng(config, time_source, Box::new(OsRng))
    }

    /// Factory with an explicit id generator
    pub fn with_rng(
        config: NotificationConfig,
        time_source: Box<dyn TimeSource>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        Self {
            config,
            time_source,
            rng: Mutex::new(rng),
        }
    }

    fn next_id(&self) -> u32 {
        self.rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .next_u32()
    }

    /// Build the request for an unhandled message. The alert is both ticker
    /// and body.
    pub fn build(&self, resolver: &dyn ResourceResolver, tap_intent: Envelope) -> NotificationRequest {
        let alert = tap_intent.message.alert.clone();
        NotificationRequest {
            notification_id: self.next_id(),
            ticker: alert.clone(),
            title: resolve_title(resolver, &self.config),
            body: alert,
            icon: resolve_icon(resolver, &self.config),
            when: self.time_source.now(),
            auto_cancel: self.config.auto_cancel,
            tap_intent,
        }
    }
}
