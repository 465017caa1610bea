//! Passcode persistence
//!
//! [`PasscodeManager`] is the single source of truth for whether a passcode
//! is configured. Nothing is cached: every call re-reads the store so that
//! external deletion is observed immediately.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::passcode::{Passcode, PasscodeInfo};
use crate::store::{AccessPolicy, CredentialStore};

/// Default store key for the passcode entry
pub const DEFAULT_STORE_KEY: &str = "applock.passcode";

/// Loads, stores and deletes the configured passcode
#[derive(Clone)]
pub struct PasscodeManager {
    key: String,
    store: Arc<dyn CredentialStore>,
    access: AccessPolicy,
}

impl PasscodeManager {
    /// Create a manager over `store` using `key`
    pub fn new(store: Arc<dyn CredentialStore>, key: impl Into<String>, access: AccessPolicy) -> Self {
        Self {
            key: key.into(),
            store,
            access,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether a passcode entry exists
    pub fn is_setup(&self) -> bool {
        match self.store.get(&self.key) {
            Ok(entry) => entry.is_some(),
            Err(e) => {
                warn!("Failed to read passcode entry: {}", e);
                false
            }
        }
    }

    /// The stored passcode, `None` if missing or unreadable
    pub fn current_passcode(&self) -> Option<Passcode> {
        match self.load() {
            Ok(passcode) => passcode,
            Err(e) => {
                warn!("Ignoring unreadable passcode entry: {}", e);
                None
            }
        }
    }

    /// Type and biometrics flag of the stored passcode
    pub fn info(&self) -> Option<PasscodeInfo> {
        self.current_passcode().map(|passcode| passcode.info())
    }

    /// Compare input against the stored passcode
    pub fn verify(&self, input: &str) -> bool {
        self.current_passcode()
            .map(|passcode| passcode.matches(input))
            .unwrap_or(false)
    }

    /// Persist a passcode, returning whether the write succeeded
    pub fn set_passcode(&self, passcode: &Passcode) -> bool {
        match self.save(passcode) {
            Ok(()) => {
                info!("Stored {} passcode", passcode.kind());
                true
            }
            Err(e) => {
                warn!("Failed to store passcode: {}", e);
                false
            }
        }
    }

    /// Toggle biometrics on the stored passcode
    ///
    /// Returns `false` when no passcode is set or the write fails.
    pub fn set_biometrics(&self, enabled: bool) -> bool {
        let Some(passcode) = self.current_passcode() else {
            debug!("No passcode set, not changing biometrics");
            return false;
        };
        self.set_passcode(&passcode.with_biometrics(enabled))
    }

    /// Remove the stored passcode, returning whether an entry was removed
    pub fn delete(&self) -> bool {
        match self.store.delete(&self.key) {
            Ok(removed) => {
                if removed {
                    info!("Deleted passcode");
                }
                removed
            }
            Err(e) => {
                warn!("Failed to delete passcode: {}", e);
                false
            }
        }
    }

    fn load(&self) -> Result<Option<Passcode>> {
        match self.store.get(&self.key)? {
            Some(bytes) => Ok(Some(Passcode::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, passcode: &Passcode) -> Result<()> {
        let bytes = zeroize::Zeroizing::new(passcode.to_bytes()?);
        self.store.set(&self.key, &bytes, self.access)?;
        Ok(())
    }
}

impl std::fmt::Debug for PasscodeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasscodeManager")
            .field("key", &self.key)
            .field("access", &self.access)
            .finish()
    }
}
