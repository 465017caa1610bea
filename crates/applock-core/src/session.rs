//! Passcode input session
//!
//! An [`InputSession`] drives one verification or capture interaction:
//! it collects keystrokes, submits them to a `check` predicate, locks the
//! input for a cooldown after each rejection and races an optional biometric
//! attempt against manual entry.
//!
//! ```text
//! Active --reject--> Locked --cooldown--> Active
//!   |                                       |
//!   +--------accept / biometric / cancel----+--> Completed
//! ```
//!
//! Completion is latched: whichever of manual entry, biometrics or
//! cancellation resolves first wins, later results are dropped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

use crate::biometric::BiometricAuthenticator;
use crate::cancel::CancelToken;
use crate::cooldown::CooldownPolicy;
use crate::passcode::PasscodeType;
use crate::types::Outcome;

/// Predicate deciding whether submitted input is accepted
pub type CheckFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Capacity of the event channel
const EVENT_CAPACITY: usize = 64;

/// Observable session events for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The buffer now holds `length` characters
    InputChanged { length: usize },
    /// The buffer was handed to the check predicate
    Submitted,
    /// The check failed; the UI should shake
    Rejected { failed_attempts: u32, cooldown: Duration },
    /// The cooldown elapsed and input is accepted again
    Ready,
    /// A biometric prompt was started
    BiometricStarted,
    /// The biometric prompt did not unlock; manual entry stays available
    BiometricFailed,
    /// Terminal event, emitted exactly once
    Completed(Outcome),
}

/// Coarse session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Locked,
    Completed(Outcome),
}

/// What happened to a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    Rejected,
    /// Nothing was submitted (locked, completed, empty or autocompleting)
    Ignored,
}

/// Biometric authenticator plus the reason shown in its prompt
#[derive(Clone)]
struct BiometricGate {
    authenticator: Arc<dyn BiometricAuthenticator>,
    reason: String,
}

struct SessionInner {
    buffer: Zeroizing<String>,
    failed_attempts: u32,
    locked: bool,
    outcome: Option<Outcome>,
    biometric_in_flight: bool,
}

/// State shared with spawned cooldown and biometric tasks
struct Shared {
    inner: Mutex<SessionInner>,
    events: broadcast::Sender<SessionEvent>,
    done: watch::Sender<Option<Outcome>>,
    cancel: CancelToken,
}

impl Shared {
    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Latch the outcome; returns false if the session already completed
    fn complete(&self, outcome: Outcome) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.outcome.is_some() {
                return false;
            }
            inner.outcome = Some(outcome);
            inner.locked = false;
            inner.buffer.zeroize();
        }

        // Stop the cooldown timer and any biometric prompt
        self.cancel.cancel();

        debug!("Input session completed: {:?}", outcome);
        self.emit(SessionEvent::Completed(outcome));
        self.done.send_replace(Some(outcome));
        true
    }

    /// Clear the buffer after a cooldown
    fn reset_input(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.outcome.is_some() {
                return;
            }
            inner.buffer.zeroize();
            inner.locked = false;
        }
        self.emit(SessionEvent::InputChanged { length: 0 });
        self.emit(SessionEvent::Ready);
    }
}

/// A single verification or capture interaction
pub struct InputSession {
    kind: PasscodeType,
    check: CheckFn,
    cooldown: CooldownPolicy,
    can_cancel: bool,
    biometrics: Option<BiometricGate>,
    shared: Arc<Shared>,
}

impl InputSession {
    /// Create a session for `kind` accepting input for which `check` holds
    pub fn new(kind: PasscodeType, check: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (done, _) = watch::channel(None);

        Self {
            kind,
            check: Arc::new(check),
            cooldown: CooldownPolicy::default(),
            can_cancel: false,
            biometrics: None,
            shared: Arc::new(Shared {
                inner: Mutex::new(SessionInner {
                    buffer: Zeroizing::new(String::new()),
                    failed_attempts: 0,
                    locked: false,
                    outcome: None,
                    biometric_in_flight: false,
                }),
                events,
                done,
                cancel: CancelToken::new(),
            }),
        }
    }

    pub fn with_cooldown(mut self, cooldown: CooldownPolicy) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Allow the user to cancel the session
    pub fn cancellable(mut self, can_cancel: bool) -> Self {
        self.can_cancel = can_cancel;
        self
    }

    /// Offer biometric unlock alongside manual entry
    pub fn with_biometrics(
        mut self,
        authenticator: Arc<dyn BiometricAuthenticator>,
        reason: impl Into<String>,
    ) -> Self {
        self.biometrics = Some(BiometricGate {
            authenticator,
            reason: reason.into(),
        });
        self
    }

    pub fn kind(&self) -> PasscodeType {
        self.kind
    }

    pub fn can_cancel(&self) -> bool {
        self.can_cancel
    }

    /// Number of characters entered
    pub fn input_len(&self) -> usize {
        self.shared.inner.lock().buffer.chars().count()
    }

    pub fn failed_attempts(&self) -> u32 {
        self.shared.inner.lock().failed_attempts
    }

    pub fn state(&self) -> SessionState {
        let inner = self.shared.inner.lock();
        match inner.outcome {
            Some(outcome) => SessionState::Completed(outcome),
            None if inner.locked => SessionState::Locked,
            None => SessionState::Active,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.state() == SessionState::Locked
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.shared.inner.lock().outcome
    }

    /// Whether biometric unlock is configured and currently possible
    pub fn biometrics_available(&self) -> bool {
        self.biometrics
            .as_ref()
            .map(|gate| gate.authenticator.is_available())
            .unwrap_or(false)
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Wait for the session to complete
    pub async fn wait(&self) -> Outcome {
        self.completion().await
    }

    /// Future resolving with the outcome, detached from the session borrow
    ///
    /// Resolves with `Cancelled` if the session is dropped without completing.
    pub fn completion(&self) -> impl std::future::Future<Output = Outcome> + Send + 'static {
        let mut done = self.shared.done.subscribe();
        async move {
            match done.wait_for(Option::is_some).await {
                Ok(outcome) => (*outcome).unwrap_or(Outcome::Cancelled),
                Err(_) => Outcome::Cancelled,
            }
        }
    }

    /// Append a character
    ///
    /// Ignored while locked, after completion, for characters the type does
    /// not accept and beyond the maximum length. A fixed numeric code is
    /// submitted as soon as it is complete; the submission result is returned.
    pub fn append(&self, c: char) -> Option<Submission> {
        if !self.kind.accepts(c) {
            return None;
        }

        let complete = {
            let mut inner = self.shared.inner.lock();
            if inner.locked || inner.outcome.is_some() {
                return None;
            }

            let length = inner.buffer.chars().count();
            if self.kind.max_input_length().is_some_and(|max| length >= max) {
                return None;
            }

            inner.buffer.push(c);
            let length = length + 1;
            self.shared.emit(SessionEvent::InputChanged { length });

            self.kind.can_autocomplete() && self.kind.max_input_length() == Some(length)
        };

        complete.then(|| self.evaluate())
    }

    /// Remove the last character
    pub fn delete_last(&self) {
        let mut inner = self.shared.inner.lock();
        if inner.locked || inner.outcome.is_some() {
            return;
        }

        if inner.buffer.pop().is_some() {
            let length = inner.buffer.chars().count();
            self.shared.emit(SessionEvent::InputChanged { length });
        }
    }

    /// Explicitly submit the buffer
    ///
    /// Only variable-length types are submitted this way; fixed numeric
    /// codes submit themselves when complete.
    pub fn submit(&self) -> Submission {
        if self.kind.can_autocomplete() {
            return Submission::Ignored;
        }
        self.evaluate()
    }

    /// Cancel on the user's behalf; returns false if cancelling is not allowed
    pub fn cancel(&self) -> bool {
        if !self.can_cancel {
            return false;
        }
        self.shared.complete(Outcome::Cancelled)
    }

    /// Tear the session down without reporting an outcome
    ///
    /// Pending cooldown resets and biometric prompts are abandoned.
    pub fn dispose(&self) {
        self.shared.cancel.cancel();
    }

    /// The session (re)gained focus: start a biometric attempt if possible
    ///
    /// Returns whether an attempt was started. At most one attempt runs at a
    /// time; manual entry remains usable while it is pending.
    pub fn focus(&self) -> bool {
        let Some(gate) = self.biometrics.clone() else {
            return false;
        };
        if self.shared.cancel.is_cancelled() || !gate.authenticator.is_available() {
            return false;
        }

        let Ok(handle) = Handle::try_current() else {
            warn!("No async runtime, skipping biometric unlock");
            return false;
        };

        {
            let mut inner = self.shared.inner.lock();
            if inner.outcome.is_some() || inner.biometric_in_flight {
                return false;
            }
            inner.biometric_in_flight = true;
        }

        self.shared.emit(SessionEvent::BiometricStarted);

        let shared = Arc::clone(&self.shared);
        let token = self.shared.cancel.clone();
        handle.spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => return,
                result = gate.authenticator.authenticate(&gate.reason) => result,
            };

            shared.inner.lock().biometric_in_flight = false;

            match result {
                Ok(true) => {
                    if !shared.complete(Outcome::Success) {
                        debug!("Biometric success arrived after completion, ignoring");
                    }
                }
                Ok(false) => {
                    debug!("Biometric authentication did not match");
                    shared.emit(SessionEvent::BiometricFailed);
                }
                Err(e) => {
                    warn!("Biometric authentication failed: {}", e);
                    shared.emit(SessionEvent::BiometricFailed);
                }
            }
        });

        true
    }

    /// Run the check predicate on the current buffer
    fn evaluate(&self) -> Submission {
        let input = {
            let mut inner = self.shared.inner.lock();
            if inner.locked || inner.outcome.is_some() || inner.buffer.is_empty() {
                return Submission::Ignored;
            }
            // Input stays disabled while the check runs
            inner.locked = true;
            Zeroizing::new(inner.buffer.as_str().to_owned())
        };

        self.shared.emit(SessionEvent::Submitted);

        if (self.check)(&input) {
            return if self.shared.complete(Outcome::Success) {
                Submission::Accepted
            } else {
                Submission::Ignored
            };
        }

        let failed_attempts = {
            let mut inner = self.shared.inner.lock();
            inner.failed_attempts = inner.failed_attempts.saturating_add(1);
            inner.failed_attempts
        };
        let cooldown = self.cooldown.delay_for(failed_attempts);

        debug!(
            "Passcode rejected ({} failed attempts), cooling down for {:?}",
            failed_attempts, cooldown
        );
        self.shared.emit(SessionEvent::Rejected {
            failed_attempts,
            cooldown,
        });
        self.schedule_reset(cooldown);

        Submission::Rejected
    }

    fn schedule_reset(&self, delay: Duration) {
        let Ok(handle) = Handle::try_current() else {
            warn!("No async runtime, clearing input without cooldown");
            self.shared.reset_input();
            return;
        };

        let shared = Arc::clone(&self.shared);
        let token = self.shared.cancel.clone();
        handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if !token.is_cancelled() {
                        shared.reset_input();
                    }
                }
            }
        });
    }
}

impl Drop for InputSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for InputSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSession")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("failed_attempts", &self.failed_attempts())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biometric::{BiometryKind, SimulatedBiometrics};

    fn code_session(kind: PasscodeType, code: &'static str) -> InputSession {
        InputSession::new(kind, move |input| input == code)
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_fixed_numeric_autosubmits_at_length() {
        let session = code_session(PasscodeType::FOUR_DIGITS, "1234");

        assert_eq!(session.append('1'), None);
        assert_eq!(session.append('2'), None);
        assert_eq!(session.append('3'), None);
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.append('4'), Some(Submission::Accepted));
        assert_eq!(session.state(), SessionState::Completed(Outcome::Success));
    }

    #[tokio::test]
    async fn test_explicit_submit_ignored_for_fixed_numeric() {
        let session = code_session(PasscodeType::FOUR_DIGITS, "12");
        session.append('1');
        session.append('2');
        assert_eq!(session.submit(), Submission::Ignored);
        assert_eq!(session.failed_attempts(), 0);
    }

    #[tokio::test]
    async fn test_variable_length_requires_submit() {
        let session = code_session(PasscodeType::Alphanumeric, "open sesame");
        for c in "open sesame".chars() {
            assert_eq!(session.append(c), None);
        }
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.submit(), Submission::Accepted);
        assert_eq!(session.wait().await, Outcome::Success);
    }

    #[tokio::test]
    async fn test_rejected_characters_and_length_clip() {
        let session = code_session(PasscodeType::FOUR_DIGITS, "1234");
        assert_eq!(session.append('x'), None);
        assert_eq!(session.input_len(), 0);

        let custom = code_session(PasscodeType::CustomNumeric, "1");
        custom.append('a');
        custom.append('1');
        assert_eq!(custom.input_len(), 1);
    }

    #[tokio::test]
    async fn test_delete_last() {
        let session = code_session(PasscodeType::CustomNumeric, "12");
        session.append('1');
        session.append('9');
        session.delete_last();
        session.append('2');
        assert_eq!(session.submit(), Submission::Accepted);
    }

    #[tokio::test]
    async fn test_empty_submit_is_ignored() {
        let session = code_session(PasscodeType::CustomNumeric, "12");
        assert_eq!(session.submit(), Submission::Ignored);
        assert_eq!(session.failed_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_locks_then_resets() {
        let session = code_session(PasscodeType::FOUR_DIGITS, "1234");
        let mut rx = session.subscribe();

        for c in "0000".chars() {
            session.append(c);
        }
        assert_eq!(session.state(), SessionState::Locked);
        assert_eq!(session.failed_attempts(), 1);

        // Input is ignored during the cooldown
        assert_eq!(session.append('1'), None);
        session.delete_last();
        assert_eq!(session.input_len(), 4);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.input_len(), 0);

        let events = drain(&mut rx);
        assert!(events.contains(&SessionEvent::Rejected {
            failed_attempts: 1,
            cooldown: Duration::from_secs(1),
        }));
        assert_eq!(events.last(), Some(&SessionEvent::Ready));

        for c in "1234".chars() {
            session.append(c);
        }
        assert_eq!(session.outcome(), Some(Outcome::Success));
    }

    #[tokio::test(start_paused = true)]
    async fn test_still_locked_before_cooldown_elapses() {
        let session = code_session(PasscodeType::CustomNumeric, "1");
        session.append('2');
        assert_eq!(session.submit(), Submission::Rejected);

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(session.is_locked());
        assert_eq!(session.submit(), Submission::Ignored);
        assert_eq!(session.failed_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_cooldown() {
        let session = code_session(PasscodeType::CustomNumeric, "1");
        session.append('2');
        session.submit();
        session.dispose();

        tokio::time::sleep(Duration::from_secs(2)).await;
        // The reset never ran
        assert!(session.is_locked());
        assert_eq!(session.input_len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_requires_permission() {
        let session = code_session(PasscodeType::FOUR_DIGITS, "1234");
        assert!(!session.cancel());
        assert_eq!(session.outcome(), None);

        let session = code_session(PasscodeType::FOUR_DIGITS, "1234").cancellable(true);
        assert!(session.cancel());
        assert_eq!(session.wait().await, Outcome::Cancelled);
        assert!(!session.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_biometric_success_completes() {
        let auth = Arc::new(
            SimulatedBiometrics::new(BiometryKind::Face).with_delay(Duration::from_millis(100)),
        );
        let session = code_session(PasscodeType::FOUR_DIGITS, "1234")
            .with_biometrics(auth.clone(), "Unlock");

        assert!(session.focus());
        assert_eq!(session.wait().await, Outcome::Success);
        assert_eq!(auth.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_biometric_failure_is_absorbed() {
        let auth = Arc::new(SimulatedBiometrics::new(BiometryKind::Fingerprint));
        auth.set_succeeds(false);
        let session = code_session(PasscodeType::FOUR_DIGITS, "1234")
            .with_biometrics(auth.clone(), "Unlock");
        let mut rx = session.subscribe();

        assert!(session.focus());
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(session.failed_attempts(), 0);
        assert_eq!(session.state(), SessionState::Active);
        assert!(drain(&mut rx).contains(&SessionEvent::BiometricFailed));

        // Focusing again retries
        assert!(session.focus());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(auth.attempts(), 2);

        for c in "1234".chars() {
            session.append(c);
        }
        assert_eq!(session.outcome(), Some(Outcome::Success));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_and_biometric_success_complete_once() {
        let auth = Arc::new(
            SimulatedBiometrics::new(BiometryKind::Face).with_delay(Duration::from_millis(500)),
        );
        let session = code_session(PasscodeType::FOUR_DIGITS, "1234")
            .with_biometrics(auth.clone(), "Unlock");
        let mut rx = session.subscribe();

        assert!(session.focus());
        for c in "1234".chars() {
            session.append(c);
        }
        tokio::time::sleep(Duration::from_secs(1)).await;

        let completions = drain(&mut rx)
            .into_iter()
            .filter(|event| matches!(event, SessionEvent::Completed(_)))
            .count();
        assert_eq!(completions, 1);
        assert_eq!(session.outcome(), Some(Outcome::Success));
    }

    #[tokio::test]
    async fn test_focus_without_biometrics() {
        let session = code_session(PasscodeType::FOUR_DIGITS, "1234");
        assert!(!session.focus());

        let auth = Arc::new(SimulatedBiometrics::new(BiometryKind::Face));
        auth.set_available(false);
        let session = code_session(PasscodeType::FOUR_DIGITS, "1234").with_biometrics(auth, "Unlock");
        assert!(!session.biometrics_available());
        assert!(!session.focus());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_biometric_attempt_in_flight() {
        let auth = Arc::new(
            SimulatedBiometrics::new(BiometryKind::Face).with_delay(Duration::from_secs(5)),
        );
        let session = code_session(PasscodeType::FOUR_DIGITS, "1234")
            .with_biometrics(auth.clone(), "Unlock");

        assert!(session.focus());
        assert!(!session.focus());
    }

    #[tokio::test(start_paused = true)]
    async fn test_progressive_cooldown() {
        let session = code_session(PasscodeType::CustomNumeric, "1")
            .with_cooldown(CooldownPolicy::progressive());

        for attempt in 1..=4u32 {
            session.append('9');
            assert_eq!(session.submit(), Submission::Rejected);
            assert_eq!(session.failed_attempts(), attempt);
            tokio::time::sleep(Duration::from_millis(1100)).await;
        }

        // Fourth failure escalated to 30 seconds
        assert!(session.is_locked());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!session.is_locked());
    }
}
