//! Applock Core - Passcode protection for applications
//!
//! This crate provides:
//! - Passcode types, validation and persistence through a credential store
//! - Input sessions with retry cooldown and biometric unlock
//! - Setup and change wizards with double entry
//! - Lock overlay presentation driven by application lifecycle events

pub mod applock;
pub mod biometric;
pub mod cancel;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod manager;
pub mod passcode;
pub mod presentation;
pub mod session;
pub mod store;
pub mod types;
pub mod wizard;

pub use applock::{AppLock, CompletionFn};
pub use biometric::{BiometricAuthenticator, BiometryKind, NoBiometrics, SimulatedBiometrics};
pub use cancel::CancelToken;
pub use config::AppLockConfig;
pub use cooldown::{CooldownPolicy, CooldownStep, DEFAULT_COOLDOWN};
pub use error::{BiometricError, PasscodeError, Result, StoreError};
pub use manager::{PasscodeManager, DEFAULT_STORE_KEY};
pub use passcode::{Passcode, PasscodeInfo, PasscodeType};
pub use presentation::{
    HeadlessOverlay, LockPresentationController, OverlayHost, PresentationEvent,
    DEFAULT_DISMISS_ANIMATION,
};
pub use session::{InputSession, SessionEvent, SessionState, Submission};
pub use store::{AccessPolicy, CredentialStore, FileStore, MemoryStore};
pub use types::{LifecycleEvent, Outcome, PasscodeMode, Visibility};
pub use wizard::{Wizard, WizardEvent, WizardKind, WizardOptions, WizardStep};
