use crate::config::DispatchSettings;
use crate::Error;
use std::time::Duration;

/// Outcome of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry { delay: Duration },
    Fail,
}

/// Bounded exponential backoff.
///
/// `max_attempts` counts every attempt including the first. After the failed
/// attempt with 0-based index `i` the policy waits `base_delay * 2^i`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    /// Statuses worth retrying. `None` retries every HTTP failure.
    retry_on_status: Option<Vec<u16>>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            retry_on_status: None,
        }
    }

    pub fn from_settings(settings: &DispatchSettings) -> Self {
        Self::new(settings.max_attempts, settings.base_delay())
    }

    /// Disable retries entirely.
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_retry_on_status(mut self, statuses: Vec<u16>) -> Self {
        self.retry_on_status = Some(statuses);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    pub fn is_retryable(&self, err: &Error) -> bool {
        match err {
            Error::Remote { status, .. } => match &self.retry_on_status {
                Some(allowed) => allowed.contains(status),
                None => true,
            },
            Error::Transport(_) => true,
            // Unparsable bodies are usually truncated responses.
            Error::Serialization(_) => true,
            _ => false,
        }
    }

    /// Decide what to do after the attempt with 0-based index `attempt` failed.
    pub fn decide(&self, err: &Error, attempt: u32) -> Decision {
        if !self.is_retryable(err) || attempt + 1 >= self.max_attempts {
            return Decision::Fail;
        }
        let mut delay = self.backoff(attempt);
        if let Error::Remote {
            retry_after_ms: Some(ms),
            ..
        } = err
        {
            delay = delay.max(Duration::from_millis(*ms));
        }
        Decision::Retry { delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&DispatchSettings::default())
    }
}
