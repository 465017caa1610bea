//! Biometric unlock capability
//!
//! The platform prompt is consumed through [`BiometricAuthenticator`]. Every
//! failure it reports falls back to manual passcode entry.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::BiometricError;

/// Kind of biometry offered by the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BiometryKind {
    Face,
    Fingerprint,
    #[default]
    None,
}

impl BiometryKind {
    /// Human readable name, `None` when the device has no biometry
    pub fn display_name(&self) -> Option<&'static str> {
        match self {
            Self::Face => Some("Face unlock"),
            Self::Fingerprint => Some("Fingerprint"),
            Self::None => None,
        }
    }
}

impl fmt::Display for BiometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name().unwrap_or("No biometrics"))
    }
}

/// Device biometric capability
#[async_trait]
pub trait BiometricAuthenticator: Send + Sync {
    /// Whether biometric authentication can be evaluated right now
    fn is_available(&self) -> bool;

    /// Which biometry the device offers
    fn biometry_kind(&self) -> BiometryKind;

    /// Prompt the user; `Ok(true)` only on a positive match
    async fn authenticate(&self, reason: &str) -> Result<bool, BiometricError>;
}

/// Authenticator for devices without biometry
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBiometrics;

#[async_trait]
impl BiometricAuthenticator for NoBiometrics {
    fn is_available(&self) -> bool {
        false
    }

    fn biometry_kind(&self) -> BiometryKind {
        BiometryKind::None
    }

    async fn authenticate(&self, _reason: &str) -> Result<bool, BiometricError> {
        Err(BiometricError::Unavailable)
    }
}

/// Configurable authenticator for demos and tests
///
/// Resolves after `delay` with a match or [`BiometricError::Denied`].
#[derive(Debug)]
pub struct SimulatedBiometrics {
    kind: BiometryKind,
    delay: Duration,
    available: AtomicBool,
    succeeds: AtomicBool,
    attempts: AtomicUsize,
}

impl SimulatedBiometrics {
    /// Available authenticator that always matches
    pub fn new(kind: BiometryKind) -> Self {
        Self {
            kind,
            delay: Duration::ZERO,
            available: AtomicBool::new(kind != BiometryKind::None),
            succeeds: AtomicBool::new(true),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_succeeds(&self, succeeds: bool) {
        self.succeeds.store(succeeds, Ordering::SeqCst);
    }

    /// Number of prompts shown so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BiometricAuthenticator for SimulatedBiometrics {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn biometry_kind(&self) -> BiometryKind {
        self.kind
    }

    async fn authenticate(&self, _reason: &str) -> Result<bool, BiometricError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.is_available() {
            return Err(BiometricError::Unavailable);
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.succeeds.load(Ordering::SeqCst) {
            Ok(true)
        } else {
            Err(BiometricError::Denied)
        }
    }
}
