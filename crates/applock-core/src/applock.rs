//! App lock facade
//!
//! [`AppLock`] wires the passcode manager, the presentation controller and
//! the input flows together behind the surface a host application uses:
//! forward lifecycle events, start setup/change/verification flows and read
//! back what should be rendered.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::biometric::BiometricAuthenticator;
use crate::config::AppLockConfig;
use crate::error::Result;
use crate::manager::PasscodeManager;
use crate::passcode::PasscodeInfo;
use crate::presentation::{LockPresentationController, OverlayHost};
use crate::session::InputSession;
use crate::store::CredentialStore;
use crate::types::{LifecycleEvent, Outcome, PasscodeMode};
use crate::wizard::{Wizard, WizardOptions, WizardStep};

/// Completion callback of a setup, change or verification flow
pub type CompletionFn = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// A running setup or change wizard and its callback
struct WizardFlow {
    wizard: Wizard,
    on_complete: Option<CompletionFn>,
}

/// App lock for one application
pub struct AppLock {
    config: AppLockConfig,
    manager: PasscodeManager,
    authenticator: Arc<dyn BiometricAuthenticator>,
    presentation: LockPresentationController,
    unlock: Option<InputSession>,
    verification: Option<InputSession>,
    wizard: Option<WizardFlow>,
}

impl AppLock {
    /// Create an app lock; the configuration is validated first
    pub fn new(
        config: AppLockConfig,
        store: Arc<dyn CredentialStore>,
        authenticator: Arc<dyn BiometricAuthenticator>,
        overlay_host: Arc<dyn OverlayHost>,
    ) -> Result<Self> {
        config.validate()?;

        let manager = PasscodeManager::new(store, config.store_key.clone(), config.access_policy);
        let presentation = LockPresentationController::new(overlay_host, config.dismiss_animation());

        Ok(Self {
            config,
            manager,
            authenticator,
            presentation,
            unlock: None,
            verification: None,
            wizard: None,
        })
    }

    pub fn config(&self) -> &AppLockConfig {
        &self.config
    }

    pub fn manager(&self) -> &PasscodeManager {
        &self.manager
    }

    pub fn authenticator(&self) -> &Arc<dyn BiometricAuthenticator> {
        &self.authenticator
    }

    pub fn is_setup(&self) -> bool {
        self.manager.is_setup()
    }

    pub fn passcode_info(&self) -> Option<PasscodeInfo> {
        self.manager.info()
    }

    /// Remove the stored passcode
    pub fn delete_passcode(&self) -> bool {
        self.manager.delete()
    }

    /// Toggle biometric unlock for the stored passcode
    pub fn set_biometrics(&self, enabled: bool) -> bool {
        self.manager.set_biometrics(enabled)
    }

    /// Change the mode used while a passcode is set
    ///
    /// Takes effect with the next lifecycle event.
    pub fn set_mode(&mut self, mode: PasscodeMode) {
        debug!("Passcode mode {:?} -> {:?}", self.config.mode, mode);
        self.config.mode = mode;
    }

    /// Mode in effect right now
    pub fn effective_mode(&self) -> PasscodeMode {
        self.config.effective_mode(self.manager.is_setup())
    }

    /// Presentation state for rendering the overlay
    pub fn overlay(&self) -> &LockPresentationController {
        &self.presentation
    }

    /// Session behind the overlay prompt, while it is shown
    pub fn unlock_session(&self) -> Option<&InputSession> {
        self.unlock.as_ref()
    }

    /// Explicit verification started by [`AppLock::start_verification`]
    pub fn verification(&self) -> Option<&InputSession> {
        self.verification.as_ref()
    }

    /// Running setup or change wizard
    pub fn wizard(&self) -> Option<&Wizard> {
        self.wizard.as_ref().map(|flow| &flow.wizard)
    }

    /// Apply a lifecycle event
    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        let mode = self.effective_mode();
        self.presentation.handle(mode, event);
        self.sync_unlock_session(event);
    }

    /// Start the setup wizard, replacing any running wizard
    pub fn start_setup(&mut self, on_complete: impl FnOnce(Outcome) + Send + 'static) -> Result<()> {
        let wizard = Wizard::setup(self.wizard_options())?;
        self.begin_wizard(wizard, Box::new(on_complete));
        Ok(())
    }

    /// Start the change wizard, replacing any running wizard
    pub fn start_change(&mut self, on_complete: impl FnOnce(Outcome) + Send + 'static) -> Result<()> {
        let wizard = Wizard::change(self.wizard_options(), &self.manager)?;
        self.begin_wizard(wizard, Box::new(on_complete));
        Ok(())
    }

    /// Run `f` against the running wizard and settle it if it finished
    pub fn drive_wizard<R>(&mut self, f: impl FnOnce(&mut Wizard) -> R) -> Option<R> {
        let result = self.wizard.as_mut().map(|flow| f(&mut flow.wizard));
        self.settle_wizard();
        result
    }

    /// Authenticate and enable biometrics from the wizard's offer step
    pub async fn enroll_biometrics(&mut self) -> Result<bool> {
        let enrolled = match self.wizard.as_mut() {
            Some(flow) => flow.wizard.enroll_biometrics().await?,
            None => false,
        };
        self.settle_wizard();
        Ok(enrolled)
    }

    /// Ask for the stored passcode outside the lock overlay
    ///
    /// Biometrics are offered only when `allow_biometrics` is set and both
    /// the configuration and the stored passcode allow them. Returns `false`
    /// when no passcode is set; the callback is not invoked.
    pub fn start_verification(
        &mut self,
        can_cancel: bool,
        allow_biometrics: bool,
        on_complete: impl FnOnce(Outcome) + Send + 'static,
    ) -> bool {
        let Some(session) = self.new_unlock_session(allow_biometrics) else {
            debug!("No passcode set, nothing to verify");
            return false;
        };
        let session = session.cancellable(can_cancel);

        if let Some(previous) = self.verification.take() {
            previous.dispose();
        }

        let completion = session.completion();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let outcome = completion.await;
                    debug!("Verification finished: {:?}", outcome);
                    on_complete(outcome);
                });
            }
            Err(_) => {
                warn!("No async runtime, verification result will not be reported");
            }
        }

        session.focus();
        self.verification = Some(session);
        true
    }

    fn wizard_options(&self) -> WizardOptions {
        WizardOptions {
            types: self.config.types.clone(),
            allow_biometrics: self.config.allow_biometrics,
            cooldown: self.config.cooldown.clone(),
            authenticator: Arc::clone(&self.authenticator),
            biometric_reason: self.config.biometric_reason.clone(),
        }
    }

    fn begin_wizard(&mut self, wizard: Wizard, on_complete: CompletionFn) {
        if let Some(mut previous) = self.wizard.take() {
            previous.wizard.cancel();
            if let Some(callback) = previous.on_complete.take() {
                callback(Outcome::Cancelled);
            }
        }
        debug!("Starting {:?} wizard", wizard.flavor());
        self.wizard = Some(WizardFlow {
            wizard,
            on_complete: Some(on_complete),
        });
    }

    /// Persist a finished wizard and report its outcome
    fn settle_wizard(&mut self) {
        let step = match &self.wizard {
            Some(flow) => flow.wizard.step(),
            None => return,
        };
        if !step.is_terminal() {
            return;
        }
        let Some(mut flow) = self.wizard.take() else {
            return;
        };

        let outcome = match (step, flow.wizard.passcode()) {
            (WizardStep::Finished, Some(passcode)) => {
                if self.manager.set_passcode(passcode) {
                    info!("Passcode {:?} completed", flow.wizard.flavor());
                    Outcome::Success
                } else {
                    Outcome::Failure
                }
            }
            (WizardStep::Finished, None) => Outcome::Failure,
            _ => Outcome::Cancelled,
        };

        if let Some(callback) = flow.on_complete.take() {
            callback(outcome);
        }
    }

    /// Start or drop the overlay unlock session to match the presentation
    ///
    /// Biometric prompts only start on launch or when returning to the
    /// foreground, never while the app is going inactive.
    fn sync_unlock_session(&mut self, event: LifecycleEvent) {
        let completed = self
            .unlock
            .as_ref()
            .is_some_and(|session| session.outcome().is_some());

        if !self.presentation.has_overlay() || completed {
            if let Some(session) = self.unlock.take() {
                session.dispose();
            }
        }

        if !self.presentation.is_prompting() {
            return;
        }

        let focus = matches!(
            event,
            LifecycleEvent::Launched | LifecycleEvent::WillEnterForeground
        );

        match &self.unlock {
            // Returning to the prompt retries biometrics
            Some(session) => {
                if focus {
                    session.focus();
                }
            }
            None => self.start_unlock_session(focus),
        }
    }

    fn start_unlock_session(&mut self, focus: bool) {
        let Some(session) = self.new_unlock_session(true) else {
            debug!("Overlay shown without a passcode, nothing to unlock");
            return;
        };

        let presentation = self.presentation.clone();
        let completion = session.completion();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if completion.await.is_success() {
                        debug!("Unlocked, dismissing overlay");
                        presentation.dismiss(true);
                    }
                });
            }
            Err(_) => warn!("No async runtime, overlay will not dismiss on unlock"),
        }

        if focus {
            session.focus();
        }
        self.unlock = Some(session);
    }

    /// Session verifying against the stored passcode
    fn new_unlock_session(&self, allow_biometrics: bool) -> Option<InputSession> {
        let info = self.manager.info()?;
        let manager = self.manager.clone();

        let mut session = InputSession::new(info.kind, move |input| manager.verify(input))
            .with_cooldown(self.config.cooldown.clone());

        if allow_biometrics && self.config.allow_biometrics && info.allow_biometrics {
            session = session.with_biometrics(
                Arc::clone(&self.authenticator),
                self.config.biometric_reason.clone(),
            );
        }

        Some(session)
    }
}

impl Drop for AppLock {
    fn drop(&mut self) {
        if let Some(session) = self.unlock.take() {
            session.dispose();
        }
        if let Some(session) = self.verification.take() {
            session.dispose();
        }
    }
}

impl std::fmt::Debug for AppLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppLock")
            .field("manager", &self.manager)
            .field("presentation", &self.presentation)
            .field("wizard", &self.wizard())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parking_lot::Mutex;

    use crate::biometric::{BiometryKind, NoBiometrics, SimulatedBiometrics};
    use crate::passcode::{Passcode, PasscodeType};
    use crate::presentation::HeadlessOverlay;
    use crate::store::MemoryStore;
    use crate::types::Visibility;

    struct Harness {
        store: Arc<MemoryStore>,
        overlay: Arc<HeadlessOverlay>,
        lock: AppLock,
    }

    fn harness(config: AppLockConfig, authenticator: Arc<dyn BiometricAuthenticator>) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let overlay = Arc::new(HeadlessOverlay::new());
        let lock = AppLock::new(config, store.clone(), authenticator, overlay.clone()).unwrap();
        Harness { store, overlay, lock }
    }

    fn recorder() -> (Arc<Mutex<Vec<Outcome>>>, impl FnOnce(Outcome) + Send + 'static) {
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcomes);
        (outcomes, move |outcome| sink.lock().push(outcome))
    }

    fn store_passcode(lock: &AppLock, code: &str, kind: PasscodeType, biometrics: bool) {
        let passcode = Passcode::new(code, kind, biometrics).unwrap();
        assert!(lock.manager().set_passcode(&passcode));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = AppLockConfig {
            types: Vec::new(),
            ..Default::default()
        };
        let result = AppLock::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(NoBiometrics),
            Arc::new(HeadlessOverlay::new()),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_setup_persists() {
        let config = AppLockConfig {
            types: vec![PasscodeType::FOUR_DIGITS],
            ..Default::default()
        };
        let mut h = harness(config, Arc::new(NoBiometrics));
        let (outcomes, on_complete) = recorder();

        h.lock.start_setup(on_complete).unwrap();
        for c in "12341234".chars() {
            h.lock.drive_wizard(|wizard| wizard.append(c));
        }

        assert!(h.lock.wizard().is_none());
        assert_eq!(*outcomes.lock(), vec![Outcome::Success]);
        assert!(h.lock.is_setup());
        assert!(h.lock.manager().verify("1234"));
    }

    #[tokio::test]
    async fn test_setup_write_failure_reports_failure() {
        let config = AppLockConfig {
            types: vec![PasscodeType::FOUR_DIGITS],
            ..Default::default()
        };
        let mut h = harness(config, Arc::new(NoBiometrics));
        h.store.set_read_only(true);
        let (outcomes, on_complete) = recorder();

        h.lock.start_setup(on_complete).unwrap();
        for c in "55555555".chars() {
            h.lock.drive_wizard(|wizard| wizard.append(c));
        }

        assert_eq!(*outcomes.lock(), vec![Outcome::Failure]);
        assert!(!h.lock.is_setup());
    }

    #[tokio::test]
    async fn test_wizard_cancel_and_replace() {
        let mut h = harness(AppLockConfig::default(), Arc::new(NoBiometrics));
        let (first, on_first) = recorder();
        let (second, on_second) = recorder();

        h.lock.start_setup(on_first).unwrap();
        h.lock.start_setup(on_second).unwrap();
        assert_eq!(*first.lock(), vec![Outcome::Cancelled]);

        h.lock.drive_wizard(|wizard| wizard.cancel());
        assert_eq!(*second.lock(), vec![Outcome::Cancelled]);
        assert!(h.lock.wizard().is_none());
        assert!(h.lock.drive_wizard(|wizard| wizard.step()).is_none());
    }

    #[tokio::test]
    async fn test_change_with_biometric_enrollment() {
        let config = AppLockConfig {
            types: vec![PasscodeType::FOUR_DIGITS],
            ..Default::default()
        };
        let auth = Arc::new(SimulatedBiometrics::new(BiometryKind::Face));
        let mut h = harness(config, auth);
        store_passcode(&h.lock, "9999", PasscodeType::FOUR_DIGITS, false);
        let (outcomes, on_complete) = recorder();

        h.lock.start_change(on_complete).unwrap();
        for c in "999912121212".chars() {
            h.lock.drive_wizard(|wizard| wizard.append(c));
        }
        assert_eq!(
            h.lock.wizard().map(Wizard::step),
            Some(WizardStep::BiometricOffer)
        );

        assert!(h.lock.enroll_biometrics().await.unwrap());
        assert_eq!(*outcomes.lock(), vec![Outcome::Success]);

        let info = h.lock.passcode_info().unwrap();
        assert!(info.allow_biometrics);
        assert!(h.lock.manager().verify("1212"));
    }

    #[tokio::test]
    async fn test_verification() {
        let mut h = harness(AppLockConfig::default(), Arc::new(NoBiometrics));
        let (outcomes, on_complete) = recorder();
        assert!(!h.lock.start_verification(true, false, |_| {}));

        store_passcode(&h.lock, "4321", PasscodeType::FOUR_DIGITS, false);
        assert!(h.lock.start_verification(true, false, on_complete));

        let session = h.lock.verification().unwrap();
        for c in "4321".chars() {
            session.append(c);
        }
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*outcomes.lock(), vec![Outcome::Success]);
    }

    #[tokio::test]
    async fn test_verification_cancel() {
        let mut h = harness(AppLockConfig::default(), Arc::new(NoBiometrics));
        store_passcode(&h.lock, "4321", PasscodeType::FOUR_DIGITS, false);
        let (outcomes, on_complete) = recorder();

        assert!(h.lock.start_verification(true, false, on_complete));
        assert!(h.lock.verification().unwrap().cancel());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*outcomes.lock(), vec![Outcome::Cancelled]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_biometrics_are_opt_in() {
        let auth = Arc::new(SimulatedBiometrics::new(BiometryKind::Fingerprint));
        let mut h = harness(AppLockConfig::default(), auth.clone());
        store_passcode(&h.lock, "4321", PasscodeType::FOUR_DIGITS, true);

        let (outcomes, on_complete) = recorder();
        assert!(h.lock.start_verification(true, false, on_complete));
        assert!(!h.lock.verification().unwrap().biometrics_available());
        assert!(!h.lock.verification().unwrap().focus());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(auth.attempts(), 0);
        assert!(outcomes.lock().is_empty());

        let (outcomes, on_complete) = recorder();
        assert!(h.lock.start_verification(true, true, on_complete));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(auth.attempts(), 1);
        assert_eq!(*outcomes.lock(), vec![Outcome::Success]);
    }

    #[tokio::test]
    async fn test_no_passcode_uses_fallback_mode() {
        let mut h = harness(AppLockConfig::default(), Arc::new(NoBiometrics));
        assert_eq!(h.lock.effective_mode(), PasscodeMode::Autohide);

        h.lock.handle_lifecycle(LifecycleEvent::Launched);
        assert_eq!(h.lock.overlay().visibility(), Visibility::Hidden);
        assert!(h.lock.unlock_session().is_none());
    }

    #[tokio::test]
    async fn test_set_mode_applies_once_set_up() {
        let mut h = harness(AppLockConfig::default(), Arc::new(NoBiometrics));
        h.lock.set_mode(PasscodeMode::Disabled);
        assert_eq!(h.lock.effective_mode(), PasscodeMode::Autohide);

        store_passcode(&h.lock, "1234", PasscodeType::FOUR_DIGITS, false);
        assert_eq!(h.lock.effective_mode(), PasscodeMode::Disabled);

        h.lock.handle_lifecycle(LifecycleEvent::DidEnterBackground);
        assert!(!h.lock.overlay().has_overlay());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlock_dismisses_overlay() {
        let config = AppLockConfig {
            mode: PasscodeMode::AlwaysVisible,
            ..Default::default()
        };
        let mut h = harness(config, Arc::new(NoBiometrics));
        store_passcode(&h.lock, "1234", PasscodeType::FOUR_DIGITS, false);

        h.lock.handle_lifecycle(LifecycleEvent::Launched);
        assert_eq!(h.lock.overlay().visibility(), Visibility::Visible);
        assert_eq!(h.overlay.live(), 1);

        let session = h.lock.unlock_session().unwrap();
        for c in "1234".chars() {
            session.append(c);
        }

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!h.lock.overlay().has_overlay());
        assert_eq!(h.overlay.fades(), 1);
        assert_eq!(h.overlay.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_biometric_unlock() {
        let config = AppLockConfig {
            mode: PasscodeMode::HideInAppSwitcher,
            ..Default::default()
        };
        let auth = Arc::new(SimulatedBiometrics::new(BiometryKind::Fingerprint));
        let mut h = harness(config, auth.clone());
        store_passcode(&h.lock, "123456", PasscodeType::SIX_DIGITS, true);

        h.lock.handle_lifecycle(LifecycleEvent::Launched);
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(auth.attempts(), 1);
        assert!(!h.lock.overlay().has_overlay());
    }

    #[tokio::test(start_paused = true)]
    async fn test_biometrics_not_offered_when_passcode_disallows() {
        let config = AppLockConfig {
            mode: PasscodeMode::AlwaysVisible,
            ..Default::default()
        };
        let auth = Arc::new(SimulatedBiometrics::new(BiometryKind::Face));
        let mut h = harness(config, auth.clone());
        store_passcode(&h.lock, "1234", PasscodeType::FOUR_DIGITS, false);

        h.lock.handle_lifecycle(LifecycleEvent::Launched);
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(auth.attempts(), 0);
        assert!(h.lock.overlay().has_overlay());
    }

    #[tokio::test(start_paused = true)]
    async fn test_biometrics_wait_for_foreground() {
        let config = AppLockConfig {
            mode: PasscodeMode::AlwaysVisible,
            ..Default::default()
        };
        let auth = Arc::new(SimulatedBiometrics::new(BiometryKind::Face));
        let mut h = harness(config, auth.clone());
        store_passcode(&h.lock, "1234", PasscodeType::FOUR_DIGITS, true);

        h.lock.handle_lifecycle(LifecycleEvent::Launched);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(auth.attempts(), 1);
        assert!(!h.lock.overlay().has_overlay());

        h.lock.handle_lifecycle(LifecycleEvent::WillResignActive);
        h.lock.handle_lifecycle(LifecycleEvent::DidEnterBackground);
        assert!(h.lock.overlay().is_prompting());
        assert!(h.lock.unlock_session().is_some());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(auth.attempts(), 1);
        assert!(h.lock.overlay().has_overlay());

        h.lock.handle_lifecycle(LifecycleEvent::WillEnterForeground);
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(auth.attempts(), 2);
        assert!(!h.lock.overlay().has_overlay());
    }

    #[tokio::test(start_paused = true)]
    async fn test_relock_after_background() {
        let config = AppLockConfig {
            mode: PasscodeMode::HideInAppSwitcher,
            ..Default::default()
        };
        let mut h = harness(config, Arc::new(NoBiometrics));
        store_passcode(&h.lock, "1234", PasscodeType::FOUR_DIGITS, false);

        h.lock.handle_lifecycle(LifecycleEvent::Launched);
        for c in "1234".chars() {
            h.lock.unlock_session().unwrap().append(c);
        }
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!h.lock.overlay().has_overlay());

        h.lock.handle_lifecycle(LifecycleEvent::WillResignActive);
        assert_eq!(h.lock.overlay().visibility(), Visibility::Hidden);
        h.lock.handle_lifecycle(LifecycleEvent::DidEnterBackground);
        assert!(h.lock.overlay().has_overlay());
        assert!(h.lock.unlock_session().is_none());

        h.lock.handle_lifecycle(LifecycleEvent::WillEnterForeground);
        assert!(h.lock.overlay().is_prompting());
        let session = h.lock.unlock_session().unwrap();
        assert_eq!(session.input_len(), 0);
        assert_eq!(session.outcome(), None);
    }
}
