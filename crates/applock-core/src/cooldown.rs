//! Input cooldown after a rejected passcode
//!
//! Every failed submission locks the input for a short delay before the
//! buffer is cleared. Optional steps lengthen the delay as failures pile up.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay before input is accepted again
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(1);

/// A longer delay once `after_attempts` failures have accumulated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownStep {
    pub after_attempts: u32,
    pub delay_ms: u64,
}

/// Cooldown policy for failed attempts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownPolicy {
    /// Delay after any failed attempt, in milliseconds
    pub base_ms: u64,
    /// Escalation thresholds, in any order
    pub steps: Vec<CooldownStep>,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_COOLDOWN)
    }
}

impl CooldownPolicy {
    /// Same delay after every failure
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base_ms: duration_ms(delay),
            steps: Vec::new(),
        }
    }

    /// Opt-in escalation for repeated failures
    ///
    /// Not used unless configured: the default policy waits the same
    /// [`DEFAULT_COOLDOWN`] after every failure.
    pub fn progressive() -> Self {
        Self {
            base_ms: duration_ms(DEFAULT_COOLDOWN),
            steps: vec![
                // Attempts 4-5: 30 seconds
                CooldownStep {
                    after_attempts: 4,
                    delay_ms: 30_000,
                },
                // Attempts 6-7: 5 minutes
                CooldownStep {
                    after_attempts: 6,
                    delay_ms: 5 * 60_000,
                },
                // Attempts 8-9: 30 minutes
                CooldownStep {
                    after_attempts: 8,
                    delay_ms: 30 * 60_000,
                },
                // Attempts 10+: 24 hours
                CooldownStep {
                    after_attempts: 10,
                    delay_ms: 24 * 60 * 60_000,
                },
            ],
        }
    }

    /// Delay to apply after the given number of failures
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let ms = self
            .steps
            .iter()
            .filter(|step| failed_attempts >= step.after_attempts)
            .max_by_key(|step| step.after_attempts)
            .map(|step| step.delay_ms)
            .unwrap_or(self.base_ms);
        Duration::from_millis(ms)
    }

    /// Human readable delay, e.g. "30 seconds"
    pub fn describe(&self, failed_attempts: u32) -> String {
        let secs = self.delay_for(failed_attempts).as_secs();
        if secs < 60 {
            format!("{} seconds", secs)
        } else if secs < 3600 {
            format!("{} minutes", secs / 60)
        } else {
            format!("{} hours", secs / 3600)
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
