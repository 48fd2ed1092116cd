//! Input content gate
//!
//! Pre-flight checks on raw source text, run once before any generation call. Side-effect
//! free and never calls the text service.

use crate::config::GenerationConfig;
use crate::text::{
    is_alphabetic_word, lexical_diversity, normalize_token, sentence_length_stats, sentences,
    tokens, word_count,
};
use crate::validation::{IssueCollector, IssueType, ValidationResult};
use serde::{Deserialize, Serialize};

/// Below this share of alphabetic tokens the text is treated as numbers or symbols.
pub const MIN_ALPHABETIC_RATIO: f64 = 0.5;
/// Share of hashtag, mention or link tokens from which text reads as a social feed.
pub const SOCIAL_MEDIA_RATIO: f64 = 0.15;
/// Quality score under which the text is flagged as poor.
pub const POOR_QUALITY_THRESHOLD: f64 = 0.4;

pub const SUPPORTED_LANGUAGES: [&str; 7] = [
    "english",
    "spanish",
    "french",
    "german",
    "italian",
    "portuguese",
    "dutch",
];

const LANGUAGE_CODES: [(&str, &str); 7] = [
    ("en", "english"),
    ("es", "spanish"),
    ("fr", "french"),
    ("de", "german"),
    ("it", "italian"),
    ("pt", "portuguese"),
    ("nl", "dutch"),
];

const EDUCATIONAL_KEYWORDS: &[&str] = &[
    "learn", "study", "research", "history", "culture", "science", "example", "because",
    "however", "therefore", "important", "explain", "develop", "discover", "community",
    "environment", "tradition", "education", "experience", "understand", "describe",
    "compare", "result", "reason", "language", "society", "health", "technology",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityFactors {
    pub has_educational_value: bool,
    pub has_varied_vocabulary: bool,
    pub has_good_structure: bool,
    pub suitable_for_language_learning: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Heuristic score in [0, 1].
    pub score: f64,
    pub factors: QualityFactors,
}

#[derive(Debug, Clone)]
pub struct ContentGate {
    min_word_count: usize,
    extraction_min_word_count: usize,
    min_quality_score: u8,
    strict_mode: bool,
}

impl Default for ContentGate {
    fn default() -> Self {
        Self::new(&GenerationConfig::default())
    }
}

impl ContentGate {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            min_word_count: config.min_word_count,
            extraction_min_word_count: config.extraction_min_word_count,
            min_quality_score: config.min_quality_score,
            strict_mode: config.strict_mode,
        }
    }

    pub fn validate(&self, text: &str) -> ValidationResult {
        self.validate_for_language(text, None)
    }

    /// Gate the text, also checking the requested target language when one is given.
    pub fn validate_for_language(&self, text: &str, target_language: Option<&str>) -> ValidationResult {
        let mut issues = IssueCollector::new();

        if text.trim().is_empty() {
            issues.error(
                IssueType::InsufficientContent,
                "Content cannot be empty",
                "Provide some text to build the lesson from",
            );
            return issues.finish_from(0, self.min_quality_score);
        }

        if let Some(language) = target_language {
            if normalize_language(language).is_none() {
                issues.error(
                    IssueType::UnsupportedLanguage,
                    format!("Target language '{}' is not supported", language),
                    format!("Choose one of: {}", SUPPORTED_LANGUAGES.join(", ")),
                );
            }
        }

        let words = word_count(text);
        if words < self.min_word_count {
            issues.error(
                IssueType::InsufficientContent,
                format!(
                    "Content has {} words; at least {} are required",
                    words, self.min_word_count
                ),
                "Select a longer passage of text",
            );
        }

        if alphabetic_ratio(text) < MIN_ALPHABETIC_RATIO {
            issues.error(
                IssueType::UnreadableContent,
                "Content appears to be mostly numbers or symbols",
                "Select a passage of running prose",
            );
        }

        if social_media_ratio(text) >= SOCIAL_MEDIA_RATIO {
            self.strict_issue(
                &mut issues,
                IssueType::SocialMediaContent,
                "Content looks like social media posts (hashtags, mentions, links)",
                "Select an article or story rather than a feed",
            );
        }

        let quality = self.check_content_quality(text);
        if quality.score < POOR_QUALITY_THRESHOLD {
            self.strict_issue(
                &mut issues,
                IssueType::PoorQuality,
                format!("Content quality is low ({:.2})", quality.score),
                "Choose well-structured text with varied vocabulary",
            );
        }
        if !quality.factors.has_educational_value {
            issues.recommend("Texts about culture, science or everyday experience make richer lessons");
        }

        issues.finish_from((quality.score * 100.0).round() as u32, self.min_quality_score)
    }

    fn strict_issue(
        &self,
        issues: &mut IssueCollector,
        issue_type: IssueType,
        message: impl Into<String>,
        suggested_action: impl Into<String>,
    ) {
        if self.strict_mode {
            issues.error(issue_type, message, suggested_action);
        } else {
            issues.warning(issue_type, message, suggested_action);
        }
    }

    /// Heuristic blend of lexical diversity, sentence-length shape and keyword presence.
    pub fn check_content_quality(&self, text: &str) -> QualityAssessment {
        let words = word_count(text);
        let diversity = lexical_diversity(text);
        let sentence_count = sentences(text).len();
        let (mean_length, variance) = sentence_length_stats(text);

        let normalized: Vec<String> = tokens(text).into_iter().map(normalize_token).collect();
        let keyword_hits = EDUCATIONAL_KEYWORDS
            .iter()
            .filter(|k| normalized.iter().any(|w| w.starts_with(*k)))
            .count();

        let factors = QualityFactors {
            has_educational_value: keyword_hits >= 1,
            has_varied_vocabulary: diversity >= 0.4,
            has_good_structure: sentence_count >= 2
                && (5.0..=35.0).contains(&mean_length)
                && variance > 0.5,
            suitable_for_language_learning: words >= self.min_word_count
                && alphabetic_ratio(text) >= 0.8
                && mean_length <= 35.0,
        };

        let diversity_part = (diversity / 0.6).min(1.0);
        let structure_part = if factors.has_good_structure {
            1.0
        } else if sentence_count > 0 {
            0.4
        } else {
            0.0
        };
        let keyword_part = (keyword_hits as f64 / 3.0).min(1.0);
        let suitability_part = if factors.suitable_for_language_learning {
            1.0
        } else {
            0.3
        };
        let score = 0.3 * diversity_part
            + 0.25 * structure_part
            + 0.2 * keyword_part
            + 0.25 * suitability_part;

        QualityAssessment {
            score: score.clamp(0.0, 1.0),
            factors,
        }
    }

    /// Upstream extraction policy: is a page long enough to offer as lesson material.
    pub fn is_suitable_for_extraction(&self, text: &str) -> bool {
        word_count(text) >= self.extraction_min_word_count
            && alphabetic_ratio(text) >= MIN_ALPHABETIC_RATIO
    }
}

/// Canonical language name for a supported name or ISO code.
pub fn normalize_language(language: &str) -> Option<&'static str> {
    let wanted = language.trim().to_lowercase();
    SUPPORTED_LANGUAGES
        .iter()
        .copied()
        .find(|l| *l == wanted)
        .or_else(|| {
            LANGUAGE_CODES
                .iter()
                .find(|(code, _)| *code == wanted)
                .map(|(_, name)| *name)
        })
}

fn alphabetic_ratio(text: &str) -> f64 {
    let all = tokens(text);
    if all.is_empty() {
        return 0.0;
    }
    let alphabetic = all.iter().filter(|t| is_alphabetic_word(t)).count();
    alphabetic as f64 / all.len() as f64
}

fn social_media_ratio(text: &str) -> f64 {
    let all = tokens(text);
    if all.is_empty() {
        return 0.0;
    }
    let social = all
        .iter()
        .filter(|t| {
            t.starts_with('#')
                || t.starts_with('@')
                || t.starts_with("http://")
                || t.starts_with("https://")
                || t.starts_with("www.")
        })
        .count();
    social as f64 / all.len() as f64
}
