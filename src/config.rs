//! Runtime configuration
//!
//! Read from `config.toml` in the user's config directory
//! (`~/.config/keyhandler/config.toml` on Linux) or from the path in
//! `KEYHANDLER_CONFIG`. Every field has a default, so a missing file or a
//! partial file is fine.

use crate::device::haptic::DEFAULT_PULSE_MS;
use crate::gesture::confirmation::{DEFAULT_CONFIRMATION_DEADLINE_MS, DEFAULT_WAKE_LOCK_TAG};
use crate::gesture::preferences::DEFAULT_GESTURE_NAMESPACE;
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "keyhandler";
const CONFIG_FILE: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "KEYHANDLER_CONFIG";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct KeyHandlerConfig {
    /// Upper bound for one proximity confirmation
    pub confirmation_deadline_ms: u64,
    pub haptic_pulse_ms: u64,
    pub dispatch_queue_capacity: usize,
    /// Preference namespace holding the gesture → action mapping
    pub gesture_namespace: String,
    pub wake_lock_tag: String,
}

impl Default for KeyHandlerConfig {
    fn default() -> Self {
        Self {
            confirmation_deadline_ms: DEFAULT_CONFIRMATION_DEADLINE_MS,
            haptic_pulse_ms: DEFAULT_PULSE_MS,
            dispatch_queue_capacity: 100,
            gesture_namespace: DEFAULT_GESTURE_NAMESPACE.to_string(),
            wake_lock_tag: DEFAULT_WAKE_LOCK_TAG.to_string(),
        }
    }
}

impl KeyHandlerConfig {
    pub fn confirmation_deadline(&self) -> Duration {
        Duration::from_millis(self.confirmation_deadline_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.confirmation_deadline_ms == 0 {
            return Err(eyre!("confirmation_deadline_ms must be greater than zero"));
        }
        if self.haptic_pulse_ms == 0 {
            return Err(eyre!("haptic_pulse_ms must be greater than zero"));
        }
        if self.dispatch_queue_capacity == 0 {
            return Err(eyre!("dispatch_queue_capacity must be greater than zero"));
        }
        if self.gesture_namespace.trim().is_empty() {
            return Err(eyre!("gesture_namespace must not be empty"));
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Default location, `None` when the platform has no config directory
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Some(path)
    }

    /// Loads the configuration from `KEYHANDLER_CONFIG` or the default path
    pub async fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => match Self::default_path() {
                Some(path) => path,
                None => {
                    warn!("No config directory available, using defaults");
                    return Ok(Self::default());
                }
            },
        };
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check config file {}: {}", path.display(), e))?;
        if !exists {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }
}
