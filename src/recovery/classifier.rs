//! Free-text error classification over an ordered rule table.

use crate::error::LessonError;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

static ERROR_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    QuotaExceeded,
    ContentIssue,
    NetworkError,
    PermissionDenied,
    Unknown,
}

impl ErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorType::ContentIssue => "CONTENT_ISSUE",
            ErrorType::NetworkError => "NETWORK_ERROR",
            ErrorType::PermissionDenied => "PERMISSION_DENIED",
            ErrorType::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Rule {
    error_type: ErrorType,
    recoverable: bool,
    patterns: &'static [&'static str],
}

/// First match wins. Patterns are matched as whole words or phrases against the
/// lowercased "name: message".
static RULES: &[Rule] = &[
    Rule {
        error_type: ErrorType::QuotaExceeded,
        recoverable: true,
        patterns: &[
            "quota",
            "rate limit",
            "ratelimit",
            "too many requests",
            "429",
            "overload",
            "overloaded",
            "resource exhausted",
            "api key",
            "invalid key",
            "provider authentication",
        ],
    },
    Rule {
        error_type: ErrorType::ContentIssue,
        recoverable: false,
        patterns: &[
            "content safety",
            "safety filter",
            "harmful content",
            "content policy",
            "inappropriate content",
            "unsafe content",
            "dependencies not accepted",
        ],
    },
    Rule {
        error_type: ErrorType::ContentIssue,
        recoverable: true,
        patterns: &[
            "validation",
            "malformed",
            "parse",
            "json",
            "unexpected token",
            "schema",
            "format",
            "invalid content",
        ],
    },
    Rule {
        error_type: ErrorType::NetworkError,
        recoverable: true,
        patterns: &[
            "timeout",
            "timed out",
            "connection",
            "network",
            "dns",
            "socket",
            "econnrefused",
            "econnreset",
            "enotfound",
            "fetch failed",
            "request failed",
        ],
    },
    Rule {
        error_type: ErrorType::PermissionDenied,
        recoverable: false,
        patterns: &[
            "cors",
            "blocked",
            "permission",
            "forbidden",
            "access denied",
            "not allowed",
            "authentication failed",
            "unauthorized",
            "not signed in",
        ],
    },
];

/// One matcher per rule, in rule order.
static RULE_MATCHERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|rule| {
            let alternatives: Vec<String> = rule.patterns.iter().map(|p| regex::escape(p)).collect();
            Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).expect("valid rule regex")
        })
        .collect()
});

/// The failure being classified, reduced to name, message and an optional trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSource {
    pub name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorSource {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            name: "Error".to_string(),
            message: message.into(),
            stack: None,
        }
    }

    /// Any error type; the `source()` chain becomes the trace.
    pub fn from_error<E: std::error::Error + ?Sized>(error: &E) -> Self {
        let mut chain = Vec::new();
        let mut current = error.source();
        while let Some(cause) = current {
            chain.push(format!("caused by: {}", cause));
            current = cause.source();
        }
        let name = std::any::type_name::<E>()
            .rsplit("::")
            .next()
            .unwrap_or("Error")
            .to_string();
        Self {
            name,
            message: error.to_string(),
            stack: if chain.is_empty() {
                None
            } else {
                Some(chain.join("\n"))
            },
        }
    }

    fn haystack(&self) -> String {
        format!("{}: {}", self.name, self.message).to_lowercase()
    }
}

impl From<&LessonError> for ErrorSource {
    fn from(error: &LessonError) -> Self {
        Self {
            name: error.name().to_string(),
            message: error.to_string(),
            stack: None,
        }
    }
}

/// Where the failure happened. Extra caller fields are kept alongside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ErrorContext {
    pub fn section(section: impl Into<String>, attempt: u32) -> Self {
        Self {
            section: Some(section.into()),
            attempt: Some(attempt),
            ..Self::default()
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedError {
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub original_error: ErrorSource,
    pub context: ErrorContext,
    pub error_id: String,
    /// False for subtypes that regeneration or retry cannot fix.
    pub recoverable: bool,
    pub timestamp: DateTime<Utc>,
}

impl ClassifiedError {
    /// Classification decided by the caller rather than the rule table.
    pub fn new(
        error_type: ErrorType,
        recoverable: bool,
        original_error: ErrorSource,
        context: ErrorContext,
    ) -> Self {
        Self {
            error_type,
            original_error,
            context,
            error_id: new_error_id(),
            recoverable,
            timestamp: Utc::now(),
        }
    }

    /// Type-level retry eligibility, before any attempt cap.
    pub fn is_retryable(&self) -> bool {
        match self.error_type {
            ErrorType::QuotaExceeded | ErrorType::NetworkError | ErrorType::Unknown => true,
            ErrorType::ContentIssue => self.recoverable,
            ErrorType::PermissionDenied => false,
        }
    }

    pub fn message(&self) -> &str {
        &self.original_error.message
    }
}

/// Match the error against the rule table. Deterministic in type; the id is fresh.
pub fn classify(error: ErrorSource, context: ErrorContext) -> ClassifiedError {
    let (error_type, recoverable) = match_rule(&error);
    ClassifiedError::new(error_type, recoverable, error, context)
}

fn match_rule(error: &ErrorSource) -> (ErrorType, bool) {
    let haystack = error.haystack();
    RULES
        .iter()
        .zip(RULE_MATCHERS.iter())
        .find(|(_, matcher)| matcher.is_match(&haystack))
        .map(|(rule, _)| (rule.error_type, rule.recoverable))
        .unwrap_or((ErrorType::Unknown, true))
}

fn new_error_id() -> String {
    let ts = Utc::now().timestamp_millis();
    let seq = ERROR_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("err-{ts:x}-{seq:04}")
}
