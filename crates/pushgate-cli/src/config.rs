//! pushgate CLI Configuration Management
//!
//! Configuration is layered with figment, lowest priority first:
//! defaults, `pushgate.toml` in the working directory, an explicit
//! `--config` file, then `PUSHGATE_*` environment variables (nested keys
//! separated by `__`, e.g. `PUSHGATE_PUSH__PACKAGE_NAME`).

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use pushgate_core::PushConfig;

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the pushgate CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliAppConfig {
    /// Delivery core configuration
    pub push: PushConfig,

    /// Simulated host application resources
    pub resources: ResourcesConfig,

    /// Storage location
    pub storage: StorageLocation,
}

/// Resources the CLI pretends the host application defines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Value of the notification title string resource
    pub notification_title: Option<String>,
    /// Application display name
    pub application_label: Option<String>,
    /// Drawable resources the application ships
    pub drawables: Vec<String>,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            notification_title: None,
            application_label: Some("pushgate".to_string()),
            drawables: Vec::new(),
        }
    }
}

/// Where the preferences document lives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageLocation {
    /// Directory holding `<namespace>.json`; platform data dir when unset
    pub data_dir: Option<PathBuf>,
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl CliAppConfig {
    fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file("pushgate.toml"));
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed("PUSHGATE_").split("__"))
    }

    /// Load configuration with the standard priority order
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
        }

        let config: CliAppConfig = Self::figment(explicit).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        self.push.validate()?;
        if let Some(dir) = &self.storage.data_dir {
            if dir.as_os_str().is_empty() {
                return Err(CliError::Config("storage.data_dir must not be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Directory holding the preferences document
    pub fn data_dir(&self) -> PathBuf {
        self.storage.data_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|dir| dir.join("pushgate"))
                .unwrap_or_else(|| PathBuf::from(".pushgate"))
        })
    }

    /// Render as TOML for display
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
