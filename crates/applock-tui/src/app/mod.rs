//! Application state and event handling

mod state;

pub use state::{AppState, Flow, MenuItem, Screen};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use applock_core::{
    AppLock, AppLockConfig, BiometricAuthenticator, BiometryKind, CredentialStore, FileStore,
    LifecycleEvent, NoBiometrics, Outcome, PasscodeMode, SimulatedBiometrics, WizardStep,
};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::prelude::*;
use tokio::sync::mpsc;

use crate::overlay::TerminalOverlay;
use crate::ui::{self, Theme};

/// Redraw interval, also drives the fade animation
const TICK_RATE: Duration = Duration::from_millis(50);

/// How long the simulated biometric prompt takes
const BIOMETRIC_DELAY: Duration = Duration::from_millis(800);

/// Startup options resolved from the command line
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub config: AppLockConfig,
    /// Where mode changes are saved, if anywhere
    pub config_path: Option<PathBuf>,
    pub store_dir: PathBuf,
    pub biometrics: BiometryKind,
}

/// Main application struct
pub struct App {
    /// Application state
    pub state: AppState,

    /// The app lock under demonstration
    pub lock: AppLock,

    /// Overlay surface the lock draws on
    pub overlay: Arc<TerminalOverlay>,

    /// Visual theme
    pub theme: Theme,

    /// Whether the app should quit
    pub should_quit: bool,

    /// Tick counter for animations
    pub tick: u64,

    config_path: Option<PathBuf>,
    completions_tx: mpsc::UnboundedSender<(Flow, Outcome)>,
    completions_rx: mpsc::UnboundedReceiver<(Flow, Outcome)>,
}

impl App {
    /// Create a new application instance
    pub fn new(options: AppOptions) -> Result<Self> {
        let store: Arc<dyn CredentialStore> = Arc::new(FileStore::new(&options.store_dir)?);
        let authenticator: Arc<dyn BiometricAuthenticator> = match options.biometrics {
            BiometryKind::None => Arc::new(NoBiometrics),
            kind => Arc::new(SimulatedBiometrics::new(kind).with_delay(BIOMETRIC_DELAY)),
        };

        Self::with_parts(options.config, store, authenticator, options.config_path)
    }

    /// Create an application over explicit collaborators
    pub fn with_parts(
        config: AppLockConfig,
        store: Arc<dyn CredentialStore>,
        authenticator: Arc<dyn BiometricAuthenticator>,
        config_path: Option<PathBuf>,
    ) -> Result<Self> {
        let overlay = Arc::new(TerminalOverlay::new());
        let lock = AppLock::new(config, store, authenticator, overlay.clone())?;
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        Ok(Self {
            state: AppState::new(),
            lock,
            overlay,
            theme: Theme::default(),
            should_quit: false,
            tick: 0,
            config_path,
            completions_tx,
            completions_rx,
        })
    }

    /// Run the application main loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.lock.handle_lifecycle(LifecycleEvent::Launched);

        let mut events = EventStream::new();
        let mut ticker = tokio::time::interval(TICK_RATE);

        while !self.should_quit {
            // Draw UI
            terminal.draw(|frame| ui::render(frame, self))?;

            tokio::select! {
                _ = ticker.tick() => {
                    self.tick = self.tick.wrapping_add(1);
                }
                event = events.next() => match event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key).await;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
            }

            self.drain_completions();
        }

        Ok(())
    }

    /// Apply finished flows reported by completion callbacks
    pub fn drain_completions(&mut self) {
        while let Ok((flow, outcome)) = self.completions_rx.try_recv() {
            tracing::info!("{:?} finished: {:?}", flow, outcome);
            self.state.finish_flow(flow, outcome);
        }
    }

    /// Handle key press events
    pub async fn handle_key(&mut self, key: KeyEvent) {
        // Global quit handler
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        // Simulated application lifecycle
        match key.code {
            KeyCode::F(2) => return self.enter_background(),
            KeyCode::F(3) => return self.enter_foreground(),
            _ => {}
        }

        if self.state.backgrounded {
            return;
        }

        // The lock overlay takes all input while it is up
        if self.lock.overlay().is_prompting() {
            self.handle_lock_key(key.code);
            return;
        }
        if self.overlay.view().is_some() {
            return;
        }

        // Delegate to screen-specific handlers
        match self.state.current_screen {
            Screen::Dashboard => self.handle_dashboard_key(key.code),
            Screen::Wizard => self.handle_wizard_key(key.code).await,
            Screen::Verify => self.handle_verify_key(key.code),
            Screen::Help => self.handle_help_key(key.code),
        }
    }

    fn enter_background(&mut self) {
        if self.state.backgrounded {
            return;
        }
        self.lock.handle_lifecycle(LifecycleEvent::WillResignActive);
        self.lock.handle_lifecycle(LifecycleEvent::DidEnterBackground);
        self.state.backgrounded = true;
    }

    fn enter_foreground(&mut self) {
        if !self.state.backgrounded {
            return;
        }
        self.lock.handle_lifecycle(LifecycleEvent::WillEnterForeground);
        self.state.backgrounded = false;
    }

    fn handle_lock_key(&mut self, key: KeyCode) {
        let Some(session) = self.lock.unlock_session() else {
            return;
        };

        match key {
            KeyCode::Char(c) => {
                session.append(c);
            }
            KeyCode::Backspace => session.delete_last(),
            KeyCode::Enter => {
                session.submit();
            }
            KeyCode::F(4) => {
                session.focus();
            }
            _ => {}
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::Char('k') => {
                if self.state.menu_index > 0 {
                    self.state.menu_index -= 1;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.state.menu_index < MenuItem::ALL.len() - 1 {
                    self.state.menu_index += 1;
                }
            }
            KeyCode::Enter => self.activate(self.state.selected_item()),
            KeyCode::Char('?') => {
                self.state.current_screen = Screen::Help;
            }
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            _ => {}
        }
    }

    fn activate(&mut self, item: MenuItem) {
        self.state.clear_messages();

        match item {
            MenuItem::SetUp => {
                if self.lock.is_setup() {
                    self.state.error_message =
                        Some("A passcode is already set, change it instead".to_string());
                    return;
                }
                let on_complete = self.completion(Flow::Setup);
                match self.lock.start_setup(on_complete) {
                    Ok(()) => self.state.current_screen = Screen::Wizard,
                    Err(e) => self.state.error_message = Some(e.to_string()),
                }
            }
            MenuItem::Change => {
                if !self.lock.is_setup() {
                    self.state.error_message = Some("No passcode set".to_string());
                    return;
                }
                let on_complete = self.completion(Flow::Change);
                match self.lock.start_change(on_complete) {
                    Ok(()) => self.state.current_screen = Screen::Wizard,
                    Err(e) => self.state.error_message = Some(e.to_string()),
                }
            }
            MenuItem::Verify => {
                let can_cancel = self.lock.config().can_cancel_verification;
                let on_complete = self.completion(Flow::Verify);
                if self.lock.start_verification(can_cancel, true, on_complete) {
                    self.state.current_screen = Screen::Verify;
                } else {
                    self.state.error_message = Some("No passcode set".to_string());
                }
            }
            MenuItem::ToggleBiometrics => match self.lock.passcode_info() {
                Some(info) => {
                    let enabled = !info.allow_biometrics;
                    if self.lock.set_biometrics(enabled) {
                        self.state.status_message = Some(format!(
                            "Biometric unlock {}",
                            if enabled { "enabled" } else { "disabled" }
                        ));
                    } else {
                        self.state.error_message = Some("Could not update the passcode".to_string());
                    }
                }
                None => self.state.error_message = Some("No passcode set".to_string()),
            },
            MenuItem::CycleMode => self.cycle_mode(),
            MenuItem::Delete => {
                if self.lock.delete_passcode() {
                    self.state.status_message = Some("Passcode deleted".to_string());
                } else {
                    self.state.error_message = Some("No passcode to delete".to_string());
                }
            }
            MenuItem::Help => self.state.current_screen = Screen::Help,
            MenuItem::Quit => self.should_quit = true,
        }
    }

    fn cycle_mode(&mut self) {
        let mode = next_mode(self.lock.config().mode);
        self.lock.set_mode(mode);
        self.state.status_message = Some(format!("Lock mode: {}", mode_label(mode)));

        if let Some(path) = &self.config_path {
            if let Err(e) = self.lock.config().save(path) {
                tracing::warn!("Failed to save config: {}", e);
                self.state.error_message = Some(format!("Could not save config: {}", e));
            }
        }
    }

    async fn handle_wizard_key(&mut self, key: KeyCode) {
        let Some(step) = self.lock.wizard().map(|wizard| wizard.step()) else {
            self.state.current_screen = Screen::Dashboard;
            return;
        };

        match (step, key) {
            (_, KeyCode::Esc) => {
                self.lock.drive_wizard(|wizard| wizard.cancel());
            }
            (WizardStep::BiometricOffer, KeyCode::Char('y')) => {
                match self.lock.enroll_biometrics().await {
                    Ok(true) => {}
                    Ok(false) => {
                        self.state.error_message =
                            Some("Biometric authentication failed".to_string());
                    }
                    Err(e) => self.state.error_message = Some(e.to_string()),
                }
            }
            (WizardStep::BiometricOffer, KeyCode::Char('n')) => {
                if let Some(Err(e)) = self.lock.drive_wizard(|wizard| wizard.choose_biometrics(false)) {
                    self.state.error_message = Some(e.to_string());
                }
            }
            (WizardStep::CaptureNew, KeyCode::Tab) => self.cycle_wizard_type(),
            (_, KeyCode::Char(c)) => {
                self.lock.drive_wizard(|wizard| wizard.append(c));
            }
            (_, KeyCode::Backspace) => {
                self.lock.drive_wizard(|wizard| wizard.delete_last());
            }
            (_, KeyCode::Enter) => {
                self.lock.drive_wizard(|wizard| wizard.submit());
            }
            _ => {}
        }
    }

    fn cycle_wizard_type(&mut self) {
        let next = self.lock.wizard().and_then(|wizard| {
            let types = wizard.types();
            let current = types.iter().position(|kind| *kind == wizard.kind()).unwrap_or(0);
            types.iter().cycle().nth(current + 1).copied()
        });

        if let Some(kind) = next {
            if let Some(Err(e)) = self.lock.drive_wizard(|wizard| wizard.select_type(kind)) {
                self.state.error_message = Some(e.to_string());
            }
        }
    }

    fn handle_verify_key(&mut self, key: KeyCode) {
        let Some(session) = self.lock.verification() else {
            self.state.current_screen = Screen::Dashboard;
            return;
        };
        if session.outcome().is_some() {
            return;
        }

        match key {
            KeyCode::Esc => {
                session.cancel();
            }
            KeyCode::Char(c) => {
                session.append(c);
            }
            KeyCode::Backspace => session.delete_last(),
            KeyCode::Enter => {
                session.submit();
            }
            KeyCode::F(4) => {
                session.focus();
            }
            _ => {}
        }
    }

    fn handle_help_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => {
                self.state.current_screen = Screen::Dashboard;
            }
            _ => {}
        }
    }

    /// Callback that reports a flow's outcome to the main loop
    fn completion(&self, flow: Flow) -> impl FnOnce(Outcome) + Send + 'static {
        let tx = self.completions_tx.clone();
        move |outcome| {
            let _ = tx.send((flow, outcome));
        }
    }
}

fn next_mode(mode: PasscodeMode) -> PasscodeMode {
    match mode {
        PasscodeMode::HideInAppSwitcher => PasscodeMode::AlwaysVisible,
        PasscodeMode::AlwaysVisible => PasscodeMode::Autohide,
        PasscodeMode::Autohide => PasscodeMode::Disabled,
        PasscodeMode::Disabled => PasscodeMode::HideInAppSwitcher,
    }
}

/// Display name of a mode
pub fn mode_label(mode: PasscodeMode) -> &'static str {
    match mode {
        PasscodeMode::HideInAppSwitcher => "hide in app switcher",
        PasscodeMode::AlwaysVisible => "always visible",
        PasscodeMode::Autohide => "autohide",
        PasscodeMode::Disabled => "disabled",
    }
}
