use std::time::Duration;

/// Decision taken after a progress check that did not report completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Attempt budget is spent; the export timed out.
    GiveUp,
    /// Wait this long, then check again.
    PollAgainAfter(Duration),
}

/// Bound on how long we wait for the remote export.
///
/// `max_attempts` counts progress checks, including the first one. The delay
/// is fixed: progress only comes as a coarse percentage, so there is nothing
/// to adapt a backoff to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl PollingPolicy {
    /// `max_attempts` must be at least 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self, super::SetupError> {
        if max_attempts == 0 {
            return Err(super::SetupError::ZeroAttempts);
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// `attempt` is 1-based and is the check that just finished.
    pub fn decide(&self, attempt: u32) -> PollDecision {
        if attempt >= self.max_attempts {
            PollDecision::GiveUp
        } else {
            PollDecision::PollAgainAfter(self.delay)
        }
    }
}
