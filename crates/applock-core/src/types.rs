//! Small shared types: display modes, lifecycle signals and outcomes

use serde::{Deserialize, Serialize};

/// When the lock overlay is shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PasscodeMode {
    /// Only the overlay background is visible in the app switcher; the
    /// passcode prompt is shown on return
    #[default]
    HideInAppSwitcher,
    /// The passcode prompt is always visible while locked
    AlwaysVisible,
    /// The overlay covers the app switcher and hides itself on return
    Autohide,
    /// The overlay never appears
    Disabled,
}

impl PasscodeMode {
    /// Mode used while no passcode is configured, unless overridden
    pub const FALLBACK: Self = Self::Autohide;

    /// Whether this mode ever creates an overlay
    pub fn uses_overlay(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// Application lifecycle signals, delivered at most once per transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Launch or initial appearance finished
    Launched,
    /// The app is about to become inactive (app switcher, system prompt)
    WillResignActive,
    /// The app moved to the background
    DidEnterBackground,
    /// The app is about to return to the foreground
    WillEnterForeground,
}

/// Whether the passcode prompt is shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Hidden,
    Visible,
}

impl Visibility {
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Visible)
    }
}

/// Result reported to completion callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure,
    Cancelled,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}
