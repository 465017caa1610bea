//! Application state

use applock_core::Outcome;

/// Current screen/view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    /// Main dashboard with menu
    #[default]
    Dashboard,

    /// Setup or change wizard
    Wizard,

    /// Explicit passcode check
    Verify,

    /// Help screen
    Help,
}

/// Flow a completion belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Setup,
    Change,
    Verify,
}

/// Dashboard menu entries, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    SetUp,
    Change,
    Verify,
    ToggleBiometrics,
    CycleMode,
    Delete,
    Help,
    Quit,
}

impl MenuItem {
    pub const ALL: [MenuItem; 8] = [
        MenuItem::SetUp,
        MenuItem::Change,
        MenuItem::Verify,
        MenuItem::ToggleBiometrics,
        MenuItem::CycleMode,
        MenuItem::Delete,
        MenuItem::Help,
        MenuItem::Quit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::SetUp => "Set up passcode",
            MenuItem::Change => "Change passcode",
            MenuItem::Verify => "Verify passcode",
            MenuItem::ToggleBiometrics => "Toggle biometric unlock",
            MenuItem::CycleMode => "Cycle lock mode",
            MenuItem::Delete => "Delete passcode",
            MenuItem::Help => "Help",
            MenuItem::Quit => "Quit",
        }
    }
}

/// Application state
#[derive(Debug, Default)]
pub struct AppState {
    /// Current screen
    pub current_screen: Screen,

    /// Dashboard menu selection index
    pub menu_index: usize,

    /// Whether the simulated app is in the background
    pub backgrounded: bool,

    /// Status message to display
    pub status_message: Option<String>,

    /// Error message to display
    pub error_message: Option<String>,
}

impl AppState {
    /// Create new application state
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_item(&self) -> MenuItem {
        MenuItem::ALL
            .get(self.menu_index)
            .copied()
            .unwrap_or(MenuItem::Quit)
    }

    /// Clear status messages
    pub fn clear_messages(&mut self) {
        self.status_message = None;
        self.error_message = None;
    }

    /// Report the end of a flow and return to the dashboard
    pub fn finish_flow(&mut self, flow: Flow, outcome: Outcome) {
        self.clear_messages();
        let message = match (flow, outcome) {
            (Flow::Setup, Outcome::Success) => "Passcode set",
            (Flow::Change, Outcome::Success) => "Passcode changed",
            (Flow::Verify, Outcome::Success) => "Passcode verified",
            (_, Outcome::Cancelled) => "Cancelled",
            (_, Outcome::Failure) => {
                self.error_message = Some("Could not save the passcode".to_string());
                self.current_screen = Screen::Dashboard;
                return;
            }
        };
        self.status_message = Some(message.to_string());
        self.current_screen = Screen::Dashboard;
    }
}
