//! Error types for the applock library

use thiserror::Error;

/// Result type alias for applock operations
pub type Result<T> = std::result::Result<T, PasscodeError>;

/// Errors surfaced by constructors, wizards and configuration
#[derive(Debug, Error)]
pub enum PasscodeError {
    /// A fixed numeric type was declared with zero digits
    #[error("Numeric passcode must have at least one digit")]
    InvalidDigits,

    /// The code is empty
    #[error("Passcode must not be empty")]
    EmptyCode,

    /// The code length does not match a fixed numeric type
    #[error("Passcode must have exactly {expected} digits, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// A numeric type contains a non-digit character
    #[error("Numeric passcode must contain only digits")]
    NonNumeric,

    /// The code contains a character its type never accepts as input
    #[error("Passcode contains a control character")]
    InvalidCharacter,

    /// The requested type is not one of the offered candidates
    #[error("Passcode type {0} is not offered")]
    UnsupportedType(String),

    /// An operation was requested in the wrong wizard step
    #[error("Invalid wizard step: {0}")]
    InvalidStep(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a [`CredentialStore`](crate::store::CredentialStore)
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding of the stored value failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend specific failure
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Errors reported by a [`BiometricAuthenticator`](crate::biometric::BiometricAuthenticator)
///
/// None of these block a session: they all fall back to manual entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BiometricError {
    /// The device has no usable biometry
    #[error("Biometrics unavailable")]
    Unavailable,

    /// The user's biometry did not match
    #[error("Biometric authentication denied")]
    Denied,

    /// The prompt was dismissed
    #[error("Biometric authentication cancelled")]
    Cancelled,

    /// Any other platform failure
    #[error("Biometric authentication failed: {0}")]
    Failed(String),
}
