//! Setup and change wizards
//!
//! A [`Wizard`] composes [`InputSession`]s into the multi-step flows used to
//! create or replace a passcode:
//!
//! ```text
//! setup:  CaptureNew -> ConfirmReenter -> [BiometricOffer] -> Finished
//! change: VerifyCurrent -> CaptureNew -> ConfirmReenter -> [BiometricOffer] -> Finished
//! ```
//!
//! A confirmation that does not match the captured code restarts the capture
//! and bumps the mismatch counter. The wizard never persists anything itself;
//! the finished [`Passcode`] is handed to the caller.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::biometric::{BiometricAuthenticator, BiometryKind};
use crate::cooldown::CooldownPolicy;
use crate::error::{PasscodeError, Result};
use crate::manager::PasscodeManager;
use crate::passcode::{Passcode, PasscodeInfo, PasscodeType};
use crate::session::{InputSession, Submission};

/// Capacity of the event channel
const EVENT_CAPACITY: usize = 32;

/// Wizard position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardStep {
    /// Enter the existing passcode (change flow only)
    VerifyCurrent,
    /// Enter the new passcode
    CaptureNew,
    /// Enter the new passcode again
    ConfirmReenter,
    /// Choose whether biometrics may unlock
    BiometricOffer,
    /// A new passcode is ready
    Finished,
    /// The user gave up
    Cancelled,
}

impl WizardStep {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

/// Which flow a wizard runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardKind {
    Setup,
    Change,
}

/// Observable wizard events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    StepChanged(WizardStep),
    /// Confirmation did not match; capture restarts
    Mismatch { count: u32 },
    /// The selected passcode type changed
    TypeChanged(PasscodeType),
    Finished(PasscodeInfo),
    Cancelled,
}

/// Settings shared by both flows
#[derive(Clone)]
pub struct WizardOptions {
    /// Candidate types; the first one is preselected
    pub types: Vec<PasscodeType>,
    /// Whether biometrics may be offered at all
    pub allow_biometrics: bool,
    pub cooldown: CooldownPolicy,
    pub authenticator: Arc<dyn BiometricAuthenticator>,
    /// Prompt text for biometric enrollment
    pub biometric_reason: String,
}

type Pending = Arc<Mutex<Option<Zeroizing<String>>>>;

/// Multi-step passcode setup or change
pub struct Wizard {
    flavor: WizardKind,
    options: WizardOptions,
    kind: PasscodeType,
    step: WizardStep,
    session: Option<InputSession>,
    pending: Pending,
    mismatch_count: u32,
    result: Option<Passcode>,
    events: broadcast::Sender<WizardEvent>,
}

impl Wizard {
    /// Start a setup flow
    pub fn setup(options: WizardOptions) -> Result<Self> {
        let mut wizard = Self::new(WizardKind::Setup, options)?;
        wizard.begin_capture();
        Ok(wizard)
    }

    /// Start a change flow
    ///
    /// Verification of the current passcode is skipped when none is stored.
    pub fn change(options: WizardOptions, manager: &PasscodeManager) -> Result<Self> {
        let mut wizard = Self::new(WizardKind::Change, options)?;

        match manager.info() {
            Some(info) => {
                let manager = manager.clone();
                let session = InputSession::new(info.kind, move |input| manager.verify(input))
                    .with_cooldown(wizard.options.cooldown.clone());
                wizard.session = Some(session);
                wizard.step = WizardStep::VerifyCurrent;
            }
            None => wizard.begin_capture(),
        }

        Ok(wizard)
    }

    fn new(flavor: WizardKind, options: WizardOptions) -> Result<Self> {
        let kind = options
            .types
            .first()
            .copied()
            .ok_or_else(|| PasscodeError::Config("no passcode types offered".to_string()))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            flavor,
            options,
            kind,
            step: WizardStep::CaptureNew,
            session: None,
            pending: Arc::new(Mutex::new(None)),
            mismatch_count: 0,
            result: None,
            events,
        })
    }

    pub fn flavor(&self) -> WizardKind {
        self.flavor
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Currently selected type for the new passcode
    pub fn kind(&self) -> PasscodeType {
        self.kind
    }

    pub fn types(&self) -> &[PasscodeType] {
        &self.options.types
    }

    /// Number of failed confirmations so far
    pub fn mismatch_count(&self) -> u32 {
        self.mismatch_count
    }

    /// Session collecting input for the current step
    pub fn session(&self) -> Option<&InputSession> {
        self.session.as_ref()
    }

    /// Biometry that would be enrolled in the offer step
    pub fn biometry_kind(&self) -> BiometryKind {
        self.options.authenticator.biometry_kind()
    }

    /// The finished passcode
    pub fn passcode(&self) -> Option<&Passcode> {
        self.result.as_ref()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WizardEvent> {
        self.events.subscribe()
    }

    /// Forward a character to the current session
    pub fn append(&mut self, c: char) {
        let submission = self.session.as_ref().and_then(|session| session.append(c));
        if let Some(submission) = submission {
            self.after_submission(submission);
        }
    }

    pub fn delete_last(&mut self) {
        if let Some(session) = &self.session {
            session.delete_last();
        }
    }

    /// Explicit submit for variable-length types
    pub fn submit(&mut self) -> Submission {
        let submission = self
            .session
            .as_ref()
            .map(InputSession::submit)
            .unwrap_or(Submission::Ignored);
        self.after_submission(submission);
        submission
    }

    /// Change the type of the new passcode
    ///
    /// Only allowed while capturing, and only to one of the offered types.
    /// The capture restarts empty; the mismatch counter is kept.
    pub fn select_type(&mut self, kind: PasscodeType) -> Result<()> {
        if self.step != WizardStep::CaptureNew {
            return Err(PasscodeError::InvalidStep(format!(
                "type can only change while capturing, not in {:?}",
                self.step
            )));
        }
        if !self.options.types.contains(&kind) {
            return Err(PasscodeError::UnsupportedType(kind.id()));
        }
        if kind == self.kind {
            return Ok(());
        }

        debug!("Passcode type changed to {}", kind);
        self.kind = kind;
        self.emit(WizardEvent::TypeChanged(kind));
        self.begin_capture();
        Ok(())
    }

    /// Answer the biometric offer and finish
    pub fn choose_biometrics(&mut self, enable: bool) -> Result<()> {
        self.expect_step(WizardStep::BiometricOffer)?;
        self.finish(enable);
        Ok(())
    }

    /// Enable biometrics after a successful authentication
    ///
    /// Finishes on a match and returns `true`. Any failure leaves the offer
    /// open so the user can retry or skip.
    pub async fn enroll_biometrics(&mut self) -> Result<bool> {
        self.expect_step(WizardStep::BiometricOffer)?;

        match self
            .options
            .authenticator
            .authenticate(&self.options.biometric_reason)
            .await
        {
            Ok(true) => {
                self.finish(true);
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                debug!("Biometric enrollment failed: {}", e);
                Ok(false)
            }
        }
    }

    /// Abandon the wizard
    pub fn cancel(&mut self) {
        if self.step.is_terminal() {
            return;
        }
        self.drop_session();
        self.pending.lock().take();
        self.go_to(WizardStep::Cancelled);
        self.emit(WizardEvent::Cancelled);
    }

    fn after_submission(&mut self, submission: Submission) {
        match (self.step, submission) {
            (WizardStep::VerifyCurrent, Submission::Accepted) => {
                debug!("Current passcode verified");
                self.begin_capture();
            }
            (WizardStep::CaptureNew, Submission::Accepted) => self.begin_confirm(),
            (WizardStep::ConfirmReenter, Submission::Accepted) => {
                if self.options.allow_biometrics && self.options.authenticator.is_available() {
                    self.drop_session();
                    self.go_to(WizardStep::BiometricOffer);
                } else {
                    self.finish(false);
                }
            }
            (WizardStep::ConfirmReenter, Submission::Rejected) => {
                self.mismatch_count = self.mismatch_count.saturating_add(1);
                debug!("Confirmation mismatch #{}", self.mismatch_count);
                self.emit(WizardEvent::Mismatch {
                    count: self.mismatch_count,
                });
                self.begin_capture();
            }
            // Rejections while verifying stay in the step; the session cools down
            _ => {}
        }
    }

    fn begin_capture(&mut self) {
        self.drop_session();
        self.pending.lock().take();

        let pending = Arc::clone(&self.pending);
        let session = InputSession::new(self.kind, move |input| {
            *pending.lock() = Some(Zeroizing::new(input.to_owned()));
            true
        })
        .with_cooldown(self.options.cooldown.clone());

        self.session = Some(session);
        self.go_to(WizardStep::CaptureNew);
    }

    fn begin_confirm(&mut self) {
        let pending = Arc::clone(&self.pending);
        let session = InputSession::new(self.kind, move |input| {
            pending
                .lock()
                .as_ref()
                .map(|code| code.as_str() == input)
                .unwrap_or(false)
        })
        .with_cooldown(self.options.cooldown.clone());

        self.drop_session();
        self.session = Some(session);
        self.go_to(WizardStep::ConfirmReenter);
    }

    fn finish(&mut self, allow_biometrics: bool) {
        self.drop_session();

        let code = self.pending.lock().take();
        let passcode = code
            .ok_or(PasscodeError::EmptyCode)
            .and_then(|code| Passcode::new(code.as_str(), self.kind, allow_biometrics));

        match passcode {
            Ok(passcode) => {
                let info = passcode.info();
                self.result = Some(passcode);
                self.go_to(WizardStep::Finished);
                self.emit(WizardEvent::Finished(info));
            }
            Err(e) => {
                warn!("Captured passcode is invalid, restarting capture: {}", e);
                self.begin_capture();
            }
        }
    }

    fn expect_step(&self, step: WizardStep) -> Result<()> {
        if self.step != step {
            return Err(PasscodeError::InvalidStep(format!(
                "expected {:?}, wizard is in {:?}",
                step, self.step
            )));
        }
        Ok(())
    }

    fn drop_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.dispose();
        }
    }

    fn go_to(&mut self, step: WizardStep) {
        if self.step != step {
            debug!("Wizard step {:?} -> {:?}", self.step, step);
        }
        self.step = step;
        self.emit(WizardEvent::StepChanged(step));
    }

    fn emit(&self, event: WizardEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for Wizard {
    fn drop(&mut self) {
        self.drop_session();
    }
}

impl std::fmt::Debug for Wizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("flavor", &self.flavor)
            .field("step", &self.step)
            .field("kind", &self.kind)
            .field("mismatch_count", &self.mismatch_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biometric::{NoBiometrics, SimulatedBiometrics};
    use crate::manager::DEFAULT_STORE_KEY;
    use crate::store::{AccessPolicy, MemoryStore};

    fn options(types: Vec<PasscodeType>, authenticator: Arc<dyn BiometricAuthenticator>) -> WizardOptions {
        WizardOptions {
            types,
            allow_biometrics: true,
            cooldown: CooldownPolicy::default(),
            authenticator,
            biometric_reason: "Enable biometrics".to_string(),
        }
    }

    fn type_code(wizard: &mut Wizard, code: &str) {
        for c in code.chars() {
            wizard.append(c);
        }
    }

    fn manager_with(code: &str, kind: PasscodeType) -> PasscodeManager {
        let manager = PasscodeManager::new(
            Arc::new(MemoryStore::new()),
            DEFAULT_STORE_KEY,
            AccessPolicy::default(),
        );
        assert!(manager.set_passcode(&Passcode::new(code, kind, false).unwrap()));
        manager
    }

    #[tokio::test]
    async fn test_setup_without_biometrics() {
        let mut wizard =
            Wizard::setup(options(vec![PasscodeType::FOUR_DIGITS], Arc::new(NoBiometrics))).unwrap();
        assert_eq!(wizard.step(), WizardStep::CaptureNew);

        type_code(&mut wizard, "1234");
        assert_eq!(wizard.step(), WizardStep::ConfirmReenter);

        type_code(&mut wizard, "1234");
        assert_eq!(wizard.step(), WizardStep::Finished);

        let passcode = wizard.passcode().unwrap();
        assert!(passcode.matches("1234"));
        assert!(!passcode.allows_biometrics());
        assert_eq!(passcode.kind(), PasscodeType::FOUR_DIGITS);
    }

    #[tokio::test]
    async fn test_confirmation_mismatch_restarts_capture() {
        let mut wizard =
            Wizard::setup(options(vec![PasscodeType::FOUR_DIGITS], Arc::new(NoBiometrics))).unwrap();
        let mut rx = wizard.subscribe();

        type_code(&mut wizard, "1234");
        type_code(&mut wizard, "1243");

        assert_eq!(wizard.step(), WizardStep::CaptureNew);
        assert_eq!(wizard.mismatch_count(), 1);
        assert_eq!(wizard.session().unwrap().input_len(), 0);
        assert!(wizard.passcode().is_none());

        let mut saw_mismatch = false;
        while let Ok(event) = rx.try_recv() {
            saw_mismatch |= event == WizardEvent::Mismatch { count: 1 };
        }
        assert!(saw_mismatch);

        // The old capture is gone; a new pair is required
        type_code(&mut wizard, "5678");
        type_code(&mut wizard, "5678");
        assert_eq!(wizard.step(), WizardStep::Finished);
        assert!(wizard.passcode().unwrap().matches("5678"));
    }

    #[tokio::test]
    async fn test_biometric_offer() {
        let auth = Arc::new(SimulatedBiometrics::new(BiometryKind::Fingerprint));
        let mut wizard =
            Wizard::setup(options(vec![PasscodeType::FOUR_DIGITS], auth)).unwrap();

        type_code(&mut wizard, "1111");
        type_code(&mut wizard, "1111");
        assert_eq!(wizard.step(), WizardStep::BiometricOffer);
        assert!(wizard.session().is_none());
        assert_eq!(wizard.biometry_kind(), BiometryKind::Fingerprint);

        wizard.choose_biometrics(true).unwrap();
        assert_eq!(wizard.step(), WizardStep::Finished);
        assert!(wizard.passcode().unwrap().allows_biometrics());
    }

    #[tokio::test]
    async fn test_biometric_offer_skip() {
        let auth = Arc::new(SimulatedBiometrics::new(BiometryKind::Face));
        let mut wizard =
            Wizard::setup(options(vec![PasscodeType::FOUR_DIGITS], auth)).unwrap();

        type_code(&mut wizard, "1111");
        type_code(&mut wizard, "1111");
        wizard.choose_biometrics(false).unwrap();
        assert!(!wizard.passcode().unwrap().allows_biometrics());
    }

    #[tokio::test]
    async fn test_biometric_offer_disabled_by_options() {
        let auth = Arc::new(SimulatedBiometrics::new(BiometryKind::Face));
        let mut opts = options(vec![PasscodeType::FOUR_DIGITS], auth);
        opts.allow_biometrics = false;
        let mut wizard = Wizard::setup(opts).unwrap();

        type_code(&mut wizard, "1111");
        type_code(&mut wizard, "1111");
        assert_eq!(wizard.step(), WizardStep::Finished);
    }

    #[tokio::test]
    async fn test_enroll_biometrics() {
        let auth = Arc::new(SimulatedBiometrics::new(BiometryKind::Face));
        auth.set_succeeds(false);
        let mut wizard =
            Wizard::setup(options(vec![PasscodeType::FOUR_DIGITS], auth.clone())).unwrap();

        type_code(&mut wizard, "2222");
        type_code(&mut wizard, "2222");

        assert!(!wizard.enroll_biometrics().await.unwrap());
        assert_eq!(wizard.step(), WizardStep::BiometricOffer);

        auth.set_succeeds(true);
        assert!(wizard.enroll_biometrics().await.unwrap());
        assert_eq!(wizard.step(), WizardStep::Finished);
        assert!(wizard.passcode().unwrap().allows_biometrics());
    }

    #[tokio::test]
    async fn test_choose_biometrics_in_wrong_step() {
        let mut wizard =
            Wizard::setup(options(vec![PasscodeType::FOUR_DIGITS], Arc::new(NoBiometrics))).unwrap();
        assert!(matches!(
            wizard.choose_biometrics(true),
            Err(PasscodeError::InvalidStep(_))
        ));
    }

    #[tokio::test]
    async fn test_select_type() {
        let types = vec![
            PasscodeType::FOUR_DIGITS,
            PasscodeType::SIX_DIGITS,
            PasscodeType::Alphanumeric,
        ];
        let mut wizard = Wizard::setup(options(types, Arc::new(NoBiometrics))).unwrap();
        assert_eq!(wizard.kind(), PasscodeType::FOUR_DIGITS);

        wizard.append('1');
        wizard.select_type(PasscodeType::Alphanumeric).unwrap();
        assert_eq!(wizard.kind(), PasscodeType::Alphanumeric);
        assert_eq!(wizard.session().unwrap().input_len(), 0);

        assert!(matches!(
            wizard.select_type(PasscodeType::CustomNumeric),
            Err(PasscodeError::UnsupportedType(_))
        ));

        type_code(&mut wizard, "hunter2");
        assert_eq!(wizard.submit(), Submission::Accepted);
        assert_eq!(wizard.step(), WizardStep::ConfirmReenter);
        assert!(matches!(
            wizard.select_type(PasscodeType::SIX_DIGITS),
            Err(PasscodeError::InvalidStep(_))
        ));

        type_code(&mut wizard, "hunter2");
        wizard.submit();
        assert_eq!(wizard.step(), WizardStep::Finished);
        assert_eq!(wizard.passcode().unwrap().kind(), PasscodeType::Alphanumeric);
    }

    #[tokio::test]
    async fn test_type_change_keeps_mismatch_count() {
        let types = vec![PasscodeType::FOUR_DIGITS, PasscodeType::SIX_DIGITS];
        let mut wizard = Wizard::setup(options(types, Arc::new(NoBiometrics))).unwrap();

        type_code(&mut wizard, "1234");
        type_code(&mut wizard, "4321");
        assert_eq!(wizard.mismatch_count(), 1);

        wizard.select_type(PasscodeType::SIX_DIGITS).unwrap();
        assert_eq!(wizard.mismatch_count(), 1);
    }

    #[tokio::test]
    async fn test_setup_requires_types() {
        assert!(matches!(
            Wizard::setup(options(Vec::new(), Arc::new(NoBiometrics))),
            Err(PasscodeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_change_verifies_current() {
        let manager = manager_with("9999", PasscodeType::FOUR_DIGITS);
        let mut wizard = Wizard::change(
            options(vec![PasscodeType::SIX_DIGITS], Arc::new(NoBiometrics)),
            &manager,
        )
        .unwrap();
        assert_eq!(wizard.flavor(), WizardKind::Change);
        assert_eq!(wizard.step(), WizardStep::VerifyCurrent);
        assert_eq!(wizard.session().unwrap().kind(), PasscodeType::FOUR_DIGITS);

        type_code(&mut wizard, "0000");
        assert_eq!(wizard.step(), WizardStep::VerifyCurrent);
        assert_eq!(wizard.session().unwrap().failed_attempts(), 1);
        assert_eq!(wizard.mismatch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_flow() {
        let manager = manager_with("9999", PasscodeType::FOUR_DIGITS);
        let mut wizard = Wizard::change(
            options(vec![PasscodeType::SIX_DIGITS], Arc::new(NoBiometrics)),
            &manager,
        )
        .unwrap();

        type_code(&mut wizard, "0000");
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        type_code(&mut wizard, "9999");
        assert_eq!(wizard.step(), WizardStep::CaptureNew);

        type_code(&mut wizard, "123456");
        type_code(&mut wizard, "123456");
        assert_eq!(wizard.step(), WizardStep::Finished);
        assert_eq!(wizard.passcode().unwrap().kind(), PasscodeType::SIX_DIGITS);
    }

    #[tokio::test]
    async fn test_change_without_passcode_starts_capturing() {
        let manager = PasscodeManager::new(
            Arc::new(MemoryStore::new()),
            DEFAULT_STORE_KEY,
            AccessPolicy::default(),
        );
        let wizard = Wizard::change(
            options(vec![PasscodeType::FOUR_DIGITS], Arc::new(NoBiometrics)),
            &manager,
        )
        .unwrap();
        assert_eq!(wizard.step(), WizardStep::CaptureNew);
    }

    #[tokio::test]
    async fn test_cancel() {
        let mut wizard =
            Wizard::setup(options(vec![PasscodeType::FOUR_DIGITS], Arc::new(NoBiometrics))).unwrap();
        type_code(&mut wizard, "1234");
        wizard.cancel();

        assert_eq!(wizard.step(), WizardStep::Cancelled);
        assert!(wizard.session().is_none());
        assert!(wizard.passcode().is_none());

        // Input after cancelling goes nowhere
        type_code(&mut wizard, "1234");
        assert_eq!(wizard.step(), WizardStep::Cancelled);
    }
}
