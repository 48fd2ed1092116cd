//! Error types for the lesson generation pipeline.

use thiserror::Error;

/// Library-wide error type
#[derive(Debug, Clone, Error)]
pub enum LessonError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("Section '{section}' cannot start: dependencies not accepted: {}", .missing.join(", "))]
    DependencyNotSatisfied {
        section: String,
        missing: Vec<String>,
    },

    #[error("No validator registered for section '{0}'")]
    UnknownSection(String),

    #[error("Invalid lesson plan: {0}")]
    InvalidPlan(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Lesson persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

impl LessonError {
    /// Stable variant name, used as the error "name" during classification.
    pub fn name(&self) -> &'static str {
        match self {
            LessonError::ProviderError(_) => "ProviderError",
            LessonError::ProviderNotConfigured(_) => "ProviderNotConfigured",
            LessonError::ProviderRequestFailed(_) => "ProviderRequestFailed",
            LessonError::ProviderAuthFailed(_) => "ProviderAuthFailed",
            LessonError::ProviderRateLimit(_) => "ProviderRateLimit",
            LessonError::ProviderModelNotFound(_) => "ProviderModelNotFound",
            LessonError::Timeout { .. } => "TimeoutError",
            LessonError::Cancelled => "Cancelled",
            LessonError::InvalidContent(_) => "ContentValidationError",
            LessonError::DependencyNotSatisfied { .. } => "DependencyNotSatisfied",
            LessonError::UnknownSection(_) => "UnknownSection",
            LessonError::InvalidPlan(_) => "InvalidPlan",
            LessonError::GenerationFailed(_) => "GenerationFailed",
            LessonError::ConfigError(_) => "ConfigError",
            LessonError::SerializationError(_) => "SerializationError",
            LessonError::PersistenceFailed(_) => "PersistenceFailed",
            LessonError::AuthenticationFailed(_) => "AuthenticationFailed",
        }
    }
}

impl From<config::ConfigError> for LessonError {
    fn from(err: config::ConfigError) -> Self {
        LessonError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for LessonError {
    fn from(err: serde_json::Error) -> Self {
        LessonError::SerializationError(err.to_string())
    }
}
