//! Configuration System
//!
//! Layered configuration for generation policy, the text provider and logging. Sources
//! are merged by [`ConfigLoader`] from built-in defaults, the global config file, the
//! workspace config files and `LESSONFORGE_*` environment variables.

use crate::logging::LoggingConfig;
use crate::validation::DEFAULT_MIN_QUALITY_SCORE;
use serde::{Deserialize, Serialize};

pub use crate::provider::{ProviderConfig, ProviderType};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LessonforgeConfig {
    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// What to do with a section that is still invalid after its last attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustedPolicy {
    /// Keep the best-scoring attempt and flag it.
    #[default]
    AcceptBest,
    /// Reject the section.
    Reject,
}

/// Generation policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Minimum words the gate accepts as lesson source
    #[serde(default = "default_min_word_count")]
    pub min_word_count: usize,

    /// Minimum words for a page to be offered for extraction upstream
    #[serde(default = "default_extraction_min_word_count")]
    pub extraction_min_word_count: usize,

    /// Acceptance threshold on the 0-100 validator score
    #[serde(default = "default_min_quality_score")]
    pub min_quality_score: u8,

    /// Require quality as well as structural validity; escalate gate warnings
    #[serde(default)]
    pub strict_mode: bool,

    /// Transport retry cap per section; `None` means uncapped
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: Option<u32>,

    #[serde(default = "default_true")]
    pub enable_retry: bool,

    /// Include the raw error in user-facing messages
    #[serde(default)]
    pub show_technical_details: bool,

    /// Total generation attempts per section, including the first
    #[serde(default = "default_max_section_attempts")]
    pub max_section_attempts: u32,

    #[serde(default)]
    pub exhausted_policy: ExhaustedPolicy,

    /// Timeout applied to every text service call
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Sections generated in parallel when their dependencies allow it
    #[serde(default = "default_max_concurrent_sections")]
    pub max_concurrent_sections: usize,

    #[serde(default = "default_support_contact")]
    pub support_contact: String,
}

fn default_min_word_count() -> usize {
    50
}

fn default_extraction_min_word_count() -> usize {
    200
}

fn default_min_quality_score() -> u8 {
    DEFAULT_MIN_QUALITY_SCORE
}

fn default_max_retry_attempts() -> Option<u32> {
    Some(3)
}

fn default_true() -> bool {
    true
}

fn default_max_section_attempts() -> u32 {
    2
}

fn default_call_timeout_ms() -> u64 {
    60_000
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_max_concurrent_sections() -> usize {
    3
}

fn default_support_contact() -> String {
    "support@lessonforge.dev".to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            min_word_count: default_min_word_count(),
            extraction_min_word_count: default_extraction_min_word_count(),
            min_quality_score: default_min_quality_score(),
            strict_mode: false,
            max_retry_attempts: default_max_retry_attempts(),
            enable_retry: default_true(),
            show_technical_details: false,
            max_section_attempts: default_max_section_attempts(),
            exhausted_policy: ExhaustedPolicy::default(),
            call_timeout_ms: default_call_timeout_ms(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_concurrent_sections: default_max_concurrent_sections(),
            support_contact: default_support_contact(),
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_word_count == 0 {
            return Err("min_word_count must be at least 1".to_string());
        }
        if self.min_quality_score > 100 {
            return Err(format!(
                "min_quality_score must be within 0-100, got {}",
                self.min_quality_score
            ));
        }
        if self.max_section_attempts == 0 {
            return Err("max_section_attempts must be at least 1".to_string());
        }
        if self.call_timeout_ms == 0 {
            return Err("call_timeout_ms must be greater than 0".to_string());
        }
        if self.max_concurrent_sections == 0 {
            return Err("max_concurrent_sections must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Generation(String),
    Provider(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Generation(msg) => write!(f, "Generation: {}", msg),
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl LessonforgeConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.generation.validate() {
            errors.push(ValidationError::Generation(e));
        }
        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
