//! Wiring of the delivery core to console collaborators

use std::sync::Arc;

use tracing::info;

use pushgate_core::{
    Dispatcher, Envelope, FileStorage, ForegroundState, KeyValueStore, ListenerChain,
    ListenerVerdict, NotificationBuilder, NotificationRequest, PendingQueue, ResourceResolver,
    Result as PushResult, UndeliveredStore,
};

use crate::config::{CliAppConfig, ResourcesConfig};
use crate::error::Result;

// ----------------------------------------------------------------------------
// Console Collaborators
// ----------------------------------------------------------------------------

/// Prints notification requests instead of rendering them
pub struct ConsoleNotifications;

impl NotificationBuilder for ConsoleNotifications {
    fn render(&self, request: NotificationRequest) -> PushResult<()> {
        println!(
            "  [notification {:08x}] {} | {} (icon {}, tap {})",
            request.notification_id,
            if request.title.is_empty() { "<untitled>" } else { request.title.as_str() },
            request.body,
            request.icon,
            request.tap_intent.action,
        );
        Ok(())
    }
}

/// Resources taken from the CLI configuration
pub struct ConfiguredResources {
    /// Name under which the configured title is published
    title_resource: String,
    resources: ResourcesConfig,
}

impl ConfiguredResources {
    pub fn new(config: &CliAppConfig) -> Self {
        Self {
            title_resource: config.push.notification.title_resource.clone(),
            resources: config.resources.clone(),
        }
    }
}

impl ResourceResolver for ConfiguredResources {
    fn string_resource(&self, name: &str) -> Option<String> {
        if name == self.title_resource {
            self.resources.notification_title.clone()
        } else {
            None
        }
    }

    fn has_drawable(&self, name: &str) -> bool {
        self.resources.drawables.iter().any(|drawable| drawable == name)
    }

    fn application_label(&self) -> Option<String> {
        self.resources.application_label.clone()
    }
}

fn claim_all(envelope: &Envelope) -> ListenerVerdict {
    println!("  [in-app] {}", envelope.message.alert);
    ListenerVerdict::Claim
}

// ----------------------------------------------------------------------------
// Application
// ----------------------------------------------------------------------------

/// Dispatcher plus the shared state the CLI reports on
pub struct PushApp {
    pub config: CliAppConfig,
    pub foreground: ForegroundState,
    pub pending: PendingQueue,
    pub dispatcher: Arc<Dispatcher>,
}

impl PushApp {
    fn open_storage(config: &CliAppConfig) -> Result<Arc<dyn KeyValueStore>> {
        let dir = config.data_dir();
        let storage = FileStorage::open(&dir, &config.push.store.namespace)?;
        info!("Using preferences at {}", storage.path().display());
        Ok(Arc::new(storage))
    }

    /// Build the dispatcher. `claim` installs a claim-everything listener.
    pub fn new(config: CliAppConfig, foreground: bool, claim: bool) -> Result<Self> {
        let chain = Arc::new(ListenerChain::new());
        if claim {
            chain.register(0, Arc::new(claim_all));
        }

        let foreground = ForegroundState::new(foreground);
        let pending = PendingQueue::new();
        let dispatcher = Dispatcher::builder(config.push.clone())
            .with_foreground(foreground.clone())
            .with_pending_queue(pending.clone())
            .with_storage(Self::open_storage(&config)?)
            .with_broadcast(chain)
            .with_notification_builder(Arc::new(ConsoleNotifications))
            .with_resources(Arc::new(ConfiguredResources::new(&config)))
            .build()?;

        Ok(Self {
            config,
            foreground,
            pending,
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// Undelivered store without a dispatcher, for inspection commands
    pub fn open_store(config: &CliAppConfig) -> Result<UndeliveredStore> {
        Ok(UndeliveredStore::new(
            Self::open_storage(config)?,
            config.push.store.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageLocation;
    use pushgate_core::{DispatchOutcome, InboundEvent, Payload};

    fn config_in(dir: &std::path::Path) -> CliAppConfig {
        CliAppConfig {
            storage: StorageLocation {
                data_dir: Some(dir.to_path_buf()),
            },
            ..CliAppConfig::default()
        }
    }

    fn event(alert: &str) -> InboundEvent {
        let mut payload = Payload::new();
        payload.insert("alert".to_string(), alert.to_string());
        InboundEvent::new(payload)
    }

    #[test]
    fn test_unhandled_messages_persist_across_app_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let app = PushApp::new(config_in(dir.path()), false, false).unwrap();
            let outcome = app.dispatcher.handle(&event("stored")).unwrap();
            assert!(outcome.is_unhandled());
            assert_eq!(app.pending.len(), 1);
        }

        let store = PushApp::open_store(&config_in(dir.path())).unwrap();
        let records = store.entries().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message.alert, "stored");
    }

    #[test]
    fn test_claim_flag_handles_in_foreground() {
        let dir = tempfile::tempdir().unwrap();
        let app = PushApp::new(config_in(dir.path()), true, true).unwrap();
        assert_eq!(
            app.dispatcher.handle(&event("hi")).unwrap(),
            DispatchOutcome::Handled
        );
        assert!(app.foreground.is_foreground());
        assert_eq!(app.dispatcher.store().count().unwrap(), 0);
    }

    #[test]
    fn test_configured_resources() {
        let config = CliAppConfig {
            resources: ResourcesConfig {
                notification_title: Some("Acme".to_string()),
                application_label: None,
                drawables: vec!["push_notification_icon".to_string()],
            },
            ..CliAppConfig::default()
        };
        let resources = ConfiguredResources::new(&config);
        assert_eq!(
            resources.string_resource("push_notification_title").as_deref(),
            Some("Acme")
        );
        assert_eq!(resources.string_resource("some_other_string"), None);
        assert_eq!(resources.application_label(), None);
        assert!(resources.has_drawable("push_notification_icon"));
        assert!(!resources.has_drawable("other"));
    }
}
