//! Credential storage
//!
//! The passcode is persisted through an opaque key-value store. Platform
//! keychains implement [`CredentialStore`]; [`MemoryStore`] and [`FileStore`]
//! cover tests, demos and desktop use.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Access restriction handed to the store on write
///
/// Interpreted by the backing store only; the library passes it through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessPolicy {
    /// Whatever the store uses by default
    #[default]
    StoreDefault,
    /// Readable only while the device is unlocked
    WhenUnlocked,
    /// Readable after the first unlock following a restart
    AfterFirstUnlock,
    /// Like `WhenUnlocked`, never migrated to another device
    WhenUnlockedThisDeviceOnly,
    /// Only while a device passcode is set, never migrated
    WhenPasscodeSetThisDeviceOnly,
}

/// Opaque persistent key-value store
pub trait CredentialStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &[u8], policy: AccessPolicy) -> StoreResult<()>;

    /// Remove `key`, returning whether an entry existed
    fn delete(&self, key: &str) -> StoreResult<bool>;
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (Vec<u8>, AccessPolicy)>>,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject all writes and deletes, simulating a locked keychain
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Policy the entry under `key` was written with
    pub fn policy(&self, key: &str) -> Option<AccessPolicy> {
        self.entries.lock().get(key).map(|(_, policy)| *policy)
    }

    /// Store raw bytes, bypassing any encoding
    pub fn insert_raw(&self, key: &str, value: &[u8]) {
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_vec(), AccessPolicy::default()));
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("store is read-only".to_string()));
        }
        Ok(())
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().get(key).map(|(value, _)| value.clone()))
    }

    fn set(&self, key: &str, value: &[u8], policy: AccessPolicy) -> StoreResult<()> {
        self.check_writable()?;
        self.entries
            .lock()
            .insert(key.to_string(), (value.to_vec(), policy));
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        self.check_writable()?;
        Ok(self.entries.lock().remove(key).is_some())
    }
}

/// One file per key inside a private directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create) a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
        }

        Ok(Self { dir })
    }

    /// Default location under the user's data directory
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("applock")
            .join("credentials")
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Keys are hex encoded so any string maps to a safe file name
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.cred", hex::encode(key.as_bytes())))
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &[u8], policy: AccessPolicy) -> StoreResult<()> {
        let path = self.path_for(key);
        fs::write(&path, value)?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }

        debug!("Stored credential at {:?} ({:?})", path, policy);
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
