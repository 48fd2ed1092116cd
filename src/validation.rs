//! Section validation
//!
//! Every section kind has one validator encoding its structural contract. Validators are
//! pure functions of (content, level, shared context) and are selected through the
//! [`ValidatorRegistry`] lookup table keyed on the section name.

use crate::context::SharedContext;
use crate::error::LessonError;
use crate::types::CefrLevel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod content;
pub mod dialogue;
pub mod discussion;
pub mod grammar;
pub mod pronunciation;
pub mod reading;
pub mod safety;
pub mod vocabulary;
pub mod warmup;

pub use content::SectionContent;

/// Default acceptance threshold on the 0-100 score.
pub const DEFAULT_MIN_QUALITY_SCORE: u8 = 60;

const ERROR_PENALTY: u32 = 25;
const WARNING_PENALTY: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    InsufficientContent,
    UnreadableContent,
    UnsupportedLanguage,
    SocialMediaContent,
    PoorQuality,
    WrongCount,
    StructuralError,
    MissingField,
    PresupposesSource,
    MissingVocabulary,
    ContentSafety,
    RegenerationExhausted,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::InsufficientContent => "insufficient_content",
            IssueType::UnreadableContent => "unreadable_content",
            IssueType::UnsupportedLanguage => "unsupported_language",
            IssueType::SocialMediaContent => "social_media_content",
            IssueType::PoorQuality => "poor_quality",
            IssueType::WrongCount => "wrong_count",
            IssueType::StructuralError => "structural_error",
            IssueType::MissingField => "missing_field",
            IssueType::PresupposesSource => "presupposes_source",
            IssueType::MissingVocabulary => "missing_vocabulary",
            IssueType::ContentSafety => "content_safety",
            IssueType::RegenerationExhausted => "regeneration_exhausted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub message: String,
    pub severity: Severity,
    pub suggested_action: String,
    pub recoverable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub meets_minimum_quality: bool,
    pub issues: Vec<ValidationIssue>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub score: u8,
}

impl ValidationResult {
    /// Recompute the quality flag against a caller-configured threshold.
    pub fn with_minimum_quality(mut self, min_quality_score: u8) -> Self {
        self.meets_minimum_quality = self.score >= min_quality_score;
        self
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn has_issue(&self, issue_type: IssueType) -> bool {
        self.issues.iter().any(|i| i.issue_type == issue_type)
    }

    /// True when an error-level issue cannot be fixed by regenerating.
    pub fn has_unrecoverable(&self) -> bool {
        self.errors().any(|i| !i.recoverable)
    }

    /// Score rescaled into [0, 1].
    pub fn quality_score(&self) -> f64 {
        f64::from(self.score) / 100.0
    }

    /// Natural-language description of what went wrong, fed back on regeneration.
    pub fn feedback(&self) -> String {
        let mut lines: Vec<String> = self
            .errors()
            .map(|i| format!("- {} ({})", i.message, i.suggested_action))
            .collect();
        lines.extend(self.warnings.iter().map(|w| format!("- warning: {}", w)));
        lines.join("\n")
    }
}

/// Accumulates issues while a validator walks the content.
#[derive(Debug, Default)]
pub struct IssueCollector {
    issues: Vec<ValidationIssue>,
    recommendations: Vec<String>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Error that regeneration can fix.
    pub fn error(
        &mut self,
        issue_type: IssueType,
        message: impl Into<String>,
        suggested_action: impl Into<String>,
    ) {
        self.push(issue_type, message, suggested_action, Severity::Error, true);
    }

    /// Error that regeneration cannot fix.
    pub fn fatal(
        &mut self,
        issue_type: IssueType,
        message: impl Into<String>,
        suggested_action: impl Into<String>,
    ) {
        self.push(issue_type, message, suggested_action, Severity::Error, false);
    }

    pub fn warning(
        &mut self,
        issue_type: IssueType,
        message: impl Into<String>,
        suggested_action: impl Into<String>,
    ) {
        self.push(issue_type, message, suggested_action, Severity::Warning, true);
    }

    pub fn recommend(&mut self, recommendation: impl Into<String>) {
        self.recommendations.push(recommendation.into());
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    fn push(
        &mut self,
        issue_type: IssueType,
        message: impl Into<String>,
        suggested_action: impl Into<String>,
        severity: Severity,
        recoverable: bool,
    ) {
        self.issues.push(ValidationIssue {
            issue_type,
            message: message.into(),
            severity,
            suggested_action: suggested_action.into(),
            recoverable,
        });
    }

    /// Score from a starting value, minus penalties per issue.
    pub fn finish_from(self, base_score: u32, min_quality_score: u8) -> ValidationResult {
        let errors = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count() as u32;
        let warnings: Vec<String> = self
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .map(|i| i.message.clone())
            .collect();
        let penalty = errors * ERROR_PENALTY + warnings.len() as u32 * WARNING_PENALTY;
        let score = base_score.min(100).saturating_sub(penalty) as u8;
        ValidationResult {
            is_valid: errors == 0,
            meets_minimum_quality: score >= min_quality_score,
            issues: self.issues,
            warnings,
            recommendations: self.recommendations,
            score,
        }
    }

    pub fn finish(self, min_quality_score: u8) -> ValidationResult {
        self.finish_from(100, min_quality_score)
    }
}

/// Structural contract for one section kind.
pub trait SectionValidator: Send + Sync {
    /// Section name this validator is registered under.
    fn section(&self) -> &'static str;

    /// Record every contract violation found in `content`.
    fn inspect(
        &self,
        content: &SectionContent,
        level: CefrLevel,
        context: &SharedContext,
        issues: &mut IssueCollector,
    );

    fn validate(
        &self,
        content: &SectionContent,
        level: CefrLevel,
        context: &SharedContext,
    ) -> ValidationResult {
        let mut issues = IssueCollector::new();
        safety::screen(content, &mut issues);
        self.inspect(content, level, context, &mut issues);
        issues.finish(DEFAULT_MIN_QUALITY_SCORE)
    }
}

/// Lookup table from section name to validator.
pub struct ValidatorRegistry {
    validators: HashMap<&'static str, Box<dyn SectionValidator>>,
    min_quality_score: u8,
}

impl ValidatorRegistry {
    pub fn empty(min_quality_score: u8) -> Self {
        Self {
            validators: HashMap::new(),
            min_quality_score,
        }
    }

    /// Registry holding every built-in section validator.
    pub fn with_defaults(min_quality_score: u8) -> Self {
        let mut registry = Self::empty(min_quality_score);
        registry.register(Box::new(warmup::WarmupValidator));
        registry.register(Box::new(vocabulary::VocabularyValidator));
        registry.register(Box::new(reading::ReadingValidator));
        registry.register(Box::new(dialogue::DialogueValidator));
        registry.register(Box::new(grammar::GrammarValidator));
        registry.register(Box::new(discussion::DiscussionValidator));
        registry.register(Box::new(pronunciation::PronunciationValidator));
        registry
    }

    pub fn register(&mut self, validator: Box<dyn SectionValidator>) {
        self.validators.insert(validator.section(), validator);
    }

    pub fn contains(&self, section: &str) -> bool {
        self.validators.contains_key(section)
    }

    pub fn min_quality_score(&self) -> u8 {
        self.min_quality_score
    }

    pub fn validate(
        &self,
        section: &str,
        content: &SectionContent,
        level: CefrLevel,
        context: &SharedContext,
    ) -> Result<ValidationResult, LessonError> {
        let validator = self
            .validators
            .get(section)
            .ok_or_else(|| LessonError::UnknownSection(section.to_string()))?;
        Ok(validator
            .validate(content, level, context)
            .with_minimum_quality(self.min_quality_score))
    }

    /// Parse a raw service response and validate it. Unparseable output yields an empty
    /// content with a recoverable structural error instead of failing.
    pub fn validate_raw(
        &self,
        section: &str,
        raw: &str,
        level: CefrLevel,
        context: &SharedContext,
    ) -> Result<(SectionContent, ValidationResult), LessonError> {
        if !self.contains(section) {
            return Err(LessonError::UnknownSection(section.to_string()));
        }
        match SectionContent::parse(raw) {
            Ok(content) => {
                let result = self.validate(section, &content, level, context)?;
                Ok((content, result))
            }
            Err(reason) => {
                let mut issues = IssueCollector::new();
                issues.error(
                    IssueType::StructuralError,
                    format!("Response for {} is not a JSON item list: {}", section, reason),
                    "Return only a JSON array whose first element is the title",
                );
                Ok((
                    SectionContent::empty(),
                    issues.finish_from(0, self.min_quality_score),
                ))
            }
        }
    }
}

/// Count-mismatch helper shared by validators.
pub(crate) fn expect_count(
    issues: &mut IssueCollector,
    what: &str,
    actual: usize,
    expected: usize,
) {
    if actual != expected {
        issues.error(
            IssueType::WrongCount,
            format!("Expected exactly {} {}, found {}", expected, what, actual),
            format!("Provide exactly {} {}", expected, what),
        );
    }
}

pub(crate) fn expect_at_least(
    issues: &mut IssueCollector,
    what: &str,
    actual: usize,
    minimum: usize,
) {
    if actual < minimum {
        issues.error(
            IssueType::WrongCount,
            format!("Expected at least {} {}, found {}", minimum, what, actual),
            format!("Provide at least {} {}", minimum, what),
        );
    }
}
