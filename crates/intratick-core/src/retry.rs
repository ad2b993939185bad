//! Retry scheduling for upstream fetch attempts.
//!
//! A fetch makes one initial attempt plus one retry per configured delay,
//! sleeping the corresponding delay before each retry. The default ladder
//! mirrors the upstream refresh cadence: 2s, 5s, 10s.

use std::time::Duration;

use crate::provider::ProviderError;

/// Classified result of a single fetch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome<T> {
    /// The attempt produced a usable value.
    Success(T),
    /// The attempt failed in a way worth retrying.
    Retryable(ProviderError),
    /// The attempt failed in a way no retry can fix.
    Fatal(ProviderError),
}

impl<T> AttemptOutcome<T> {
    /// Classify a provider result into the retry state machine.
    pub fn classify(result: Result<T, ProviderError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) if error.retryable() => Self::Retryable(error),
            Err(error) => Self::Fatal(error),
        }
    }
}

/// Delay ladder applied between fetch attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delays applied before retry 1, 2, ... (total attempts = len + 1).
    pub delays: Vec<Duration>,
    /// Whether to apply random jitter (+/- 25%) to each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::from_secs(2),
                Duration::from_secs(5),
                Duration::from_secs(10),
            ],
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given fixed ladder and no jitter.
    pub fn fixed(delays: Vec<Duration>) -> Self {
        Self {
            delays,
            jitter: false,
        }
    }

    /// Policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            delays: Vec::new(),
            jitter: false,
        }
    }

    /// Immediate retries, used by tests to avoid real sleeps.
    pub fn immediate(retries: usize) -> Self {
        Self {
            delays: vec![Duration::ZERO; retries],
            jitter: false,
        }
    }

    /// Total attempts including the initial one.
    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// Delay to sleep before retry number `retry` (1-based).
    ///
    /// Returns `None` once the ladder is exhausted.
    pub fn delay_before_retry(&self, retry: usize) -> Option<Duration> {
        let base = *self.delays.get(retry.checked_sub(1)?)?;
        if !self.jitter || base.is_zero() {
            return Some(base);
        }

        // Jitter: +/- 25% of the base delay.
        let spread_ms = (base.as_millis() as f64 * 0.25) as u64;
        let offset = fastrand::u64(0..=spread_ms * 2) as i64 - spread_ms as i64;
        let total_ms = base.as_millis() as i64 + offset;
        Some(Duration::from_millis(total_ms.max(0) as u64))
    }
}
