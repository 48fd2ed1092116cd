//! Per-key retry counters with exponential backoff.

use crate::recovery::classifier::ClassifiedError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Exponent cap so the delay computation cannot overflow.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Tracks retry attempts keyed by an opaque session identifier.
#[derive(Debug)]
pub struct RetryManager {
    attempts: Mutex<HashMap<String, u32>>,
    base_delay_ms: u64,
    max_retry_attempts: Option<u32>,
    enable_retry: bool,
}

impl Default for RetryManager {
    fn default() -> Self {
        Self::new(1000, None, true)
    }
}

impl RetryManager {
    /// `max_retry_attempts: None` leaves retries uncapped.
    pub fn new(base_delay_ms: u64, max_retry_attempts: Option<u32>, enable_retry: bool) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            base_delay_ms,
            max_retry_attempts,
            enable_retry,
        }
    }

    /// `base * 2^attempts`; an unknown key counts as zero attempts.
    pub fn retry_delay(&self, key: &str) -> Duration {
        let attempts = self.attempts(key).min(MAX_BACKOFF_EXPONENT);
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << attempts))
    }

    /// Increment and return the attempt count for `key`.
    pub fn record_retry_attempt(&self, key: &str) -> u32 {
        let mut attempts = self.attempts.lock();
        let count = attempts.entry(key.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn clear_retry_attempts(&self, key: &str) {
        self.attempts.lock().remove(key);
    }

    pub fn attempts(&self, key: &str) -> u32 {
        self.attempts.lock().get(key).copied().unwrap_or(0)
    }

    pub fn max_retry_attempts(&self) -> Option<u32> {
        self.max_retry_attempts
    }

    /// Retry only when enabled, the error is of a retryable kind, and the key is under
    /// the attempt cap.
    pub fn can_retry(&self, error: &ClassifiedError, key: &str) -> bool {
        if !self.enable_retry || !error.is_retryable() {
            return false;
        }
        match self.max_retry_attempts {
            Some(max) => self.attempts(key) < max,
            None => true,
        }
    }
}
