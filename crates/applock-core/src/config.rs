//! App lock configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cooldown::CooldownPolicy;
use crate::error::{PasscodeError, Result};
use crate::manager::DEFAULT_STORE_KEY;
use crate::passcode::PasscodeType;
use crate::store::AccessPolicy;
use crate::types::PasscodeMode;

/// Configuration file name
const CONFIG_FILE_NAME: &str = "config.json";

/// Configuration directory under the platform config dir
const CONFIG_DIR_NAME: &str = "applock";

/// App lock configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppLockConfig {
    /// Presentation mode while a passcode is set
    pub mode: PasscodeMode,

    /// Presentation mode while no passcode is set
    pub fallback_mode: PasscodeMode,

    /// Passcode types offered by the setup and change wizards
    pub types: Vec<PasscodeType>,

    /// Credential store key of the passcode entry
    pub store_key: String,

    /// Access policy handed to the credential store
    pub access_policy: AccessPolicy,

    /// Whether biometric unlock may be offered
    pub allow_biometrics: bool,

    /// Prompt text for biometric authentication
    pub biometric_reason: String,

    /// Delay after failed attempts
    pub cooldown: CooldownPolicy,

    /// Fade duration of an animated overlay dismissal
    pub dismiss_animation_ms: u64,

    /// Whether explicit verification prompts can be cancelled
    pub can_cancel_verification: bool,
}

impl Default for AppLockConfig {
    fn default() -> Self {
        Self {
            mode: PasscodeMode::default(),
            fallback_mode: PasscodeMode::FALLBACK,
            types: vec![
                PasscodeType::SIX_DIGITS,
                PasscodeType::FOUR_DIGITS,
                PasscodeType::CustomNumeric,
                PasscodeType::Alphanumeric,
            ],
            store_key: DEFAULT_STORE_KEY.to_string(),
            access_policy: AccessPolicy::default(),
            allow_biometrics: true,
            biometric_reason: "Unlock the application".to_string(),
            cooldown: CooldownPolicy::default(),
            dismiss_animation_ms: 300,
            can_cancel_verification: true,
        }
    }
}

impl AppLockConfig {
    /// Default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check the configuration for values the lock cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.types.is_empty() {
            return Err(PasscodeError::Config(
                "at least one passcode type is required".to_string(),
            ));
        }
        if self.store_key.trim().is_empty() {
            return Err(PasscodeError::Config("store key must not be empty".to_string()));
        }
        Ok(())
    }

    /// Presentation mode for the current setup state
    pub fn effective_mode(&self, is_setup: bool) -> PasscodeMode {
        if is_setup {
            self.mode
        } else {
            self.fallback_mode
        }
    }

    pub fn dismiss_animation(&self) -> Duration {
        Duration::from_millis(self.dismiss_animation_ms)
    }
}
