//! Retry policy for transient failures.
//!
//! Retries use a fixed pause between attempts. There is no backoff and no
//! jitter; the backend sees at most `max_retries + 1` identical requests.

use std::time::Duration;

/// Statuses retried when a policy does not name its own.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Declares whether and how a failed call is reissued.
///
/// # Examples
///
/// ```
/// use pagewise::RetryPolicy;
/// use std::time::Duration;
///
/// // Up to 3 attempts in total, one second apart, on the default statuses.
/// let policy = RetryPolicy::new(2, Duration::from_secs(1));
/// assert!(policy.is_retryable(503));
/// assert!(!policy.is_retryable(404));
///
/// // Only retry on 503.
/// let policy = RetryPolicy::new(2, Duration::ZERO).with_retryable_status_codes([503]);
/// assert!(!policy.is_retryable(500));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: usize,
    /// The pause before each retry.
    pub delay: Duration,
    /// Response statuses worth retrying.
    pub retryable_status_codes: Vec<u16>,
}

impl RetryPolicy {
    /// Creates a policy retrying the default statuses.
    pub fn new(max_retries: usize, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.to_vec(),
        }
    }

    /// Replaces the set of retryable statuses.
    pub fn with_retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    /// Total number of attempts this policy allows.
    pub fn max_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    /// Returns the delay before the given retry, or `None` once retries are exhausted.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The retry number (1-indexed, so 1 = first retry)
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_retries {
            None
        } else {
            Some(self.delay)
        }
    }
}
