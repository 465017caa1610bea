//! Screen modules for different views

pub mod dashboard;
pub mod help;
pub mod lock;
pub mod verify;
pub mod wizard;

use applock_core::{CooldownPolicy, InputSession};

/// Feedback line for a session: cooldown, failures, or nothing
pub(crate) fn session_feedback(session: &InputSession, cooldown: &CooldownPolicy) -> Option<String> {
    let failed = session.failed_attempts();
    if session.is_locked() {
        Some(format!(
            "Wrong passcode. Try again in {}",
            cooldown.describe(failed)
        ))
    } else if failed > 0 {
        Some(format!(
            "{} failed attempt{}",
            failed,
            if failed == 1 { "" } else { "s" }
        ))
    } else {
        None
    }
}
