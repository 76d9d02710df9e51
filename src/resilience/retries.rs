//! Retry policy for downstream fetches.
//!
//! # Design Decisions
//! - Only transport errors and 5xx responses are retried
//! - Decode errors and 4xx responses fail immediately
//! - Jittered backoff between attempts

use std::time::Duration;

use crate::aggregation::FetchError;
use crate::config::DownstreamConfig;
use crate::resilience::backoff::retry_delay;

/// How often and how patiently a fetcher retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn from_config(config: &DownstreamConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    /// Delay before retry number `retry` (1-based), or `None` when exhausted
    /// or the error is not worth retrying.
    pub fn next_delay(&self, retry: u32, err: &FetchError) -> Option<Duration> {
        if retry > self.max_retries || !is_retryable(err) {
            return None;
        }
        Some(retry_delay(
            retry,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        ))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DownstreamConfig::default())
    }
}

/// Whether a failed fetch may succeed if tried again.
pub fn is_retryable(err: &FetchError) -> bool {
    match err {
        FetchError::Transport(_) => true,
        FetchError::Status(code) => (500..600).contains(code),
        FetchError::Decode(_) | FetchError::Aborted(_) | FetchError::Other(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable(&FetchError::Transport("reset".into())));
        assert!(is_retryable(&FetchError::Status(503)));
        assert!(!is_retryable(&FetchError::Status(404)));
        assert!(!is_retryable(&FetchError::Decode("eof".into())));
    }

    #[test]
    fn test_policy_exhausts() {
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay_ms: 10,
            max_delay_ms: 100,
        };
        let err = FetchError::Status(502);
        assert!(policy.next_delay(1, &err).is_some());
        assert!(policy.next_delay(2, &err).is_some());
        assert!(policy.next_delay(3, &err).is_none());
        assert!(policy.next_delay(1, &FetchError::Status(400)).is_none());
        assert!(RetryPolicy::none().next_delay(1, &err).is_none());
    }
}
