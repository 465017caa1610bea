//! Passcode data model
//!
//! A [`PasscodeType`] describes the shape of a code, a [`Passcode`] is a
//! concrete code together with its type and the biometrics preference.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize, Serializer};
use zeroize::Zeroize;

use crate::error::{PasscodeError, Result};

/// Shape and validation rules of a passcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PasscodeType {
    /// Fixed width numeric code, submitted as soon as all digits are entered
    Numeric(NonZeroU32),
    /// Numeric code of any length, submitted explicitly
    CustomNumeric,
    /// Code of any length made of arbitrary characters, submitted explicitly
    Alphanumeric,
}

impl PasscodeType {
    /// Four digit numeric code
    pub const FOUR_DIGITS: Self = Self::Numeric(NonZeroU32::MIN.saturating_add(3));

    /// Six digit numeric code
    pub const SIX_DIGITS: Self = Self::Numeric(NonZeroU32::MIN.saturating_add(5));

    /// Create a fixed width numeric type
    pub fn numeric(digits: u32) -> Result<Self> {
        NonZeroU32::new(digits)
            .map(Self::Numeric)
            .ok_or(PasscodeError::InvalidDigits)
    }

    /// Whether the code is made of digits only
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric(_) | Self::CustomNumeric)
    }

    pub fn is_alphanumeric(&self) -> bool {
        matches!(self, Self::Alphanumeric)
    }

    /// Whether input is submitted automatically once complete
    pub fn can_autocomplete(&self) -> bool {
        matches!(self, Self::Numeric(_))
    }

    /// Maximum number of characters, `None` when unbounded
    pub fn max_input_length(&self) -> Option<usize> {
        match self {
            Self::Numeric(digits) => usize::try_from(digits.get()).ok(),
            Self::CustomNumeric | Self::Alphanumeric => None,
        }
    }

    /// Stable identifier, usable as a map key
    pub fn id(&self) -> String {
        match self {
            Self::Numeric(digits) => format!("numeric.{}", digits),
            Self::CustomNumeric => "numeric.custom".to_string(),
            Self::Alphanumeric => "alphanumeric.custom".to_string(),
        }
    }

    /// Whether a single input character is valid for this type
    pub fn accepts(&self, c: char) -> bool {
        if self.is_numeric() {
            c.is_ascii_digit()
        } else {
            !c.is_control()
        }
    }

    /// Check a complete code against this type
    pub fn validate(&self, code: &str) -> Result<()> {
        if code.is_empty() {
            return Err(PasscodeError::EmptyCode);
        }

        if self.is_numeric() && !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(PasscodeError::NonNumeric);
        }

        if !code.chars().all(|c| self.accepts(c)) {
            return Err(PasscodeError::InvalidCharacter);
        }

        if let Some(expected) = self.max_input_length() {
            let actual = code.chars().count();
            if actual != expected {
                return Err(PasscodeError::LengthMismatch { expected, actual });
            }
        }

        Ok(())
    }
}

impl Default for PasscodeType {
    fn default() -> Self {
        Self::SIX_DIGITS
    }
}

impl fmt::Display for PasscodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(digits) => write!(f, "{}-digit numeric code", digits),
            Self::CustomNumeric => write!(f, "custom numeric code"),
            Self::Alphanumeric => write!(f, "custom alphanumeric code"),
        }
    }
}

/// A configured passcode
///
/// The code itself never leaves this type except through serialization for
/// the credential store. Use [`Passcode::matches`] to compare input.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "StoredPasscode")]
pub struct Passcode {
    code: String,
    kind: PasscodeType,
    allow_biometrics: bool,
}

impl Passcode {
    /// Create a passcode, validating the code against its type
    pub fn new(code: impl Into<String>, kind: PasscodeType, allow_biometrics: bool) -> Result<Self> {
        let mut code = code.into();
        if let Err(e) = kind.validate(&code) {
            code.zeroize();
            return Err(e);
        }

        Ok(Self {
            code,
            kind,
            allow_biometrics,
        })
    }

    pub fn kind(&self) -> PasscodeType {
        self.kind
    }

    /// The stored biometrics preference
    ///
    /// Advisory only: availability must still be checked on the device.
    pub fn allows_biometrics(&self) -> bool {
        self.allow_biometrics
    }

    /// Compare input against the code
    pub fn matches(&self, input: &str) -> bool {
        let expected = self.code.as_bytes();
        let actual = input.as_bytes();
        if expected.len() != actual.len() {
            return false;
        }
        expected
            .iter()
            .zip(actual)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Copy of this passcode with the biometrics flag replaced
    pub fn with_biometrics(&self, enabled: bool) -> Self {
        let mut passcode = self.clone();
        passcode.allow_biometrics = enabled;
        passcode
    }

    /// Public view without the code
    pub fn info(&self) -> PasscodeInfo {
        PasscodeInfo {
            kind: self.kind,
            allow_biometrics: self.allow_biometrics,
        }
    }

    /// Encode for the credential store
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a value read from the credential store
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl Drop for Passcode {
    fn drop(&mut self) {
        self.code.zeroize();
    }
}

impl fmt::Debug for Passcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Passcode")
            .field("code", &"<redacted>")
            .field("kind", &self.kind)
            .field("allow_biometrics", &self.allow_biometrics)
            .finish()
    }
}

impl Serialize for Passcode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        StoredPasscodeRef {
            code: &self.code,
            kind: self.kind,
            allow_biometrics: self.allow_biometrics,
        }
        .serialize(serializer)
    }
}

/// Storage layout, borrowed for encoding
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredPasscodeRef<'a> {
    code: &'a str,
    #[serde(rename = "type")]
    kind: PasscodeType,
    allow_biometrics: bool,
}

/// Storage layout, owned for decoding
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPasscode {
    code: String,
    #[serde(rename = "type")]
    kind: PasscodeType,
    #[serde(default)]
    allow_biometrics: bool,
}

impl Drop for StoredPasscode {
    fn drop(&mut self) {
        self.code.zeroize();
    }
}

impl TryFrom<StoredPasscode> for Passcode {
    type Error = PasscodeError;

    fn try_from(mut stored: StoredPasscode) -> Result<Self> {
        let code = std::mem::take(&mut stored.code);
        Passcode::new(code, stored.kind, stored.allow_biometrics)
    }
}

/// What callers may learn about the configured passcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasscodeInfo {
    #[serde(rename = "type")]
    pub kind: PasscodeType,
    pub allow_biometrics: bool,
}
