//! Error classification and recovery.
//!
//! Arbitrary failures are reduced to a closed taxonomy ([`ErrorType`]) by an ordered
//! rule table, retried with per-key exponential backoff, and rendered into user and
//! support messages with recovery options.

pub mod classifier;
pub mod messages;
pub mod retry;

pub use classifier::{classify, ClassifiedError, ErrorContext, ErrorSource, ErrorType};
pub use messages::{RecoveryAction, RecoveryOption, SupportMessage, UserMessage};
pub use retry::RetryManager;

use crate::config::GenerationConfig;
use tracing::warn;

/// Classifier, retry policy and message rendering configured for one session.
#[derive(Debug)]
pub struct ErrorHandler {
    retry: RetryManager,
    support_contact: String,
    show_technical_details: bool,
}

impl ErrorHandler {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            retry: RetryManager::new(
                config.retry_base_delay_ms,
                config.max_retry_attempts,
                config.enable_retry,
            ),
            support_contact: config.support_contact.clone(),
            show_technical_details: config.show_technical_details,
        }
    }

    /// Classify and log.
    pub fn classify(&self, error: ErrorSource, context: ErrorContext) -> ClassifiedError {
        let classified = classify(error, context);
        self.log(&classified);
        classified
    }

    /// Log a classification the caller made directly.
    pub fn record(&self, classified: ClassifiedError) -> ClassifiedError {
        self.log(&classified);
        classified
    }

    fn log(&self, classified: &ClassifiedError) {
        warn!(
            error_id = %classified.error_id,
            error_type = %classified.error_type,
            section = classified.context.section.as_deref().unwrap_or("-"),
            attempt = classified.context.attempt.unwrap_or(0),
            recoverable = classified.recoverable,
            message = %classified.original_error.message,
            "classified generation error"
        );
    }

    pub fn retry_manager(&self) -> &RetryManager {
        &self.retry
    }

    pub fn can_retry(&self, error: &ClassifiedError, key: &str) -> bool {
        self.retry.can_retry(error, key)
    }

    pub fn user_message(&self, error: &ClassifiedError) -> UserMessage {
        messages::user_message(error, &self.support_contact, self.show_technical_details)
    }

    pub fn support_message(&self, error: &ClassifiedError) -> SupportMessage {
        messages::support_message(error)
    }

    pub fn recovery_options(&self, error: &ClassifiedError, key: &str) -> Vec<RecoveryOption> {
        messages::recovery_options(error, self.can_retry(error, key))
    }
}
