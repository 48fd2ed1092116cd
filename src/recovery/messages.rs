//! User-facing and support-facing renderings of a classified error, plus the recovery
//! options offered with it.

use crate::recovery::classifier::{ClassifiedError, ErrorContext, ErrorType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub message: String,
    pub actionable_steps: Vec<String>,
    pub error_id: String,
    pub support_contact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportMessage {
    pub error_id: String,
    pub timestamp: DateTime<Utc>,
    pub error_type: ErrorType,
    pub context: ErrorContext,
    pub technical_details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    Retry,
    RetryLater,
    TryDifferentContent,
    ManualSelection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryOption {
    pub action: RecoveryAction,
    pub label: String,
    pub description: String,
    pub primary: bool,
}

impl RecoveryOption {
    fn new(action: RecoveryAction, primary: bool) -> Self {
        let (label, description) = match action {
            RecoveryAction::Retry => ("Try again", "Run the generation again now"),
            RecoveryAction::RetryLater => (
                "Try again later",
                "Wait a few minutes for the service limit to reset, then retry",
            ),
            RecoveryAction::TryDifferentContent => (
                "Use different content",
                "Pick another passage that is longer or more suitable for a lesson",
            ),
            RecoveryAction::ManualSelection => (
                "Select text manually",
                "Paste or highlight the text you want to turn into a lesson",
            ),
        };
        Self {
            action,
            label: label.to_string(),
            description: description.to_string(),
            primary,
        }
    }
}

struct Template {
    message: &'static str,
    steps: &'static [&'static str],
}

fn template(error_type: ErrorType) -> Template {
    match error_type {
        ErrorType::QuotaExceeded => Template {
            message: "The lesson service is busy or its usage limit has been reached.",
            steps: &[
                "Wait a few minutes before trying again",
                "Check that the service API key is valid and has remaining quota",
            ],
        },
        ErrorType::ContentIssue => Template {
            message: "The selected content could not be turned into a lesson.",
            steps: &[
                "Choose a longer passage of plain prose",
                "Avoid lists, tables and social media feeds",
            ],
        },
        ErrorType::NetworkError => Template {
            message: "We could not reach the lesson service.",
            steps: &[
                "Check your internet connection",
                "Try again in a moment",
            ],
        },
        ErrorType::PermissionDenied => Template {
            message: "This page does not allow its content to be read automatically.",
            steps: &[
                "Select the text manually and try again",
                "Sign in again if your session has expired",
            ],
        },
        ErrorType::Unknown => Template {
            message: "Something went wrong while creating your lesson.",
            steps: &[
                "Try again",
                "If the problem continues, contact support with the error id",
            ],
        },
    }
}

pub fn user_message(
    error: &ClassifiedError,
    support_contact: &str,
    show_technical_details: bool,
) -> UserMessage {
    let template = template(error.error_type);
    UserMessage {
        message: template.message.to_string(),
        actionable_steps: template.steps.iter().map(|s| s.to_string()).collect(),
        error_id: error.error_id.clone(),
        support_contact: support_contact.to_string(),
        technical_details: show_technical_details
            .then(|| format!("{}: {}", error.original_error.name, error.original_error.message)),
    }
}

pub fn support_message(error: &ClassifiedError) -> SupportMessage {
    SupportMessage {
        error_id: error.error_id.clone(),
        timestamp: error.timestamp,
        error_type: error.error_type,
        context: error.context.clone(),
        technical_details: format!(
            "{}: {} (recoverable: {})",
            error.original_error.name, error.original_error.message, error.recoverable
        ),
        stack_trace: error.original_error.stack.clone(),
    }
}

/// Options for the caller. Manual selection is always offered and exactly one option
/// is primary.
pub fn recovery_options(error: &ClassifiedError, can_retry: bool) -> Vec<RecoveryOption> {
    let mut options = match error.error_type {
        ErrorType::QuotaExceeded if can_retry => {
            vec![RecoveryOption::new(RecoveryAction::RetryLater, true)]
        }
        ErrorType::NetworkError | ErrorType::Unknown if can_retry => {
            vec![RecoveryOption::new(RecoveryAction::Retry, true)]
        }
        ErrorType::ContentIssue if error.recoverable && can_retry => vec![
            RecoveryOption::new(RecoveryAction::Retry, true),
            RecoveryOption::new(RecoveryAction::TryDifferentContent, false),
        ],
        ErrorType::ContentIssue => {
            vec![RecoveryOption::new(RecoveryAction::TryDifferentContent, true)]
        }
        ErrorType::PermissionDenied => {
            vec![RecoveryOption::new(RecoveryAction::ManualSelection, true)]
        }
        _ => Vec::new(),
    };

    if !options
        .iter()
        .any(|o| o.action == RecoveryAction::ManualSelection)
    {
        let primary = options.is_empty();
        options.push(RecoveryOption::new(RecoveryAction::ManualSelection, primary));
    }
    options
}
