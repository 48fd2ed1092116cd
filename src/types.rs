//! Core shared types: proficiency levels and section names.

use crate::error::LessonError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// CEFR proficiency tier, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CefrLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
}

impl CefrLevel {
    pub const ALL: [CefrLevel; 5] = [
        CefrLevel::A1,
        CefrLevel::A2,
        CefrLevel::B1,
        CefrLevel::B2,
        CefrLevel::C1,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CefrLevel::A1 => "A1",
            CefrLevel::A2 => "A2",
            CefrLevel::B1 => "B1",
            CefrLevel::B2 => "B2",
            CefrLevel::C1 => "C1",
        }
    }

    /// Example sentences required per vocabulary word. Non-increasing with level.
    pub fn vocabulary_examples(self) -> usize {
        match self {
            CefrLevel::A1 | CefrLevel::A2 => 5,
            CefrLevel::B1 => 4,
            CefrLevel::B2 => 3,
            CefrLevel::C1 => 2,
        }
    }

    /// Paragraphs in the composite reading section.
    pub fn reading_paragraphs(self) -> usize {
        match self {
            CefrLevel::A1 | CefrLevel::A2 => 3,
            CefrLevel::B1 | CefrLevel::B2 => 4,
            CefrLevel::C1 => 5,
        }
    }

    /// Short learner description used when building prompts.
    pub fn describe(self) -> &'static str {
        match self {
            CefrLevel::A1 => "beginner: very short sentences and the most common words",
            CefrLevel::A2 => "elementary: simple sentences about familiar topics",
            CefrLevel::B1 => "intermediate: connected text on familiar matters",
            CefrLevel::B2 => "upper intermediate: detailed text with some abstract ideas",
            CefrLevel::C1 => "advanced: complex text with nuance and idiomatic language",
        }
    }
}

impl fmt::Display for CefrLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CefrLevel {
    type Err = LessonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A1" => Ok(CefrLevel::A1),
            "A2" => Ok(CefrLevel::A2),
            "B1" => Ok(CefrLevel::B1),
            "B2" => Ok(CefrLevel::B2),
            "C1" => Ok(CefrLevel::C1),
            other => Err(LessonError::ConfigError(format!(
                "Unknown CEFR level: {} (expected A1, A2, B1, B2 or C1)",
                other
            ))),
        }
    }
}

/// Section kind identifiers.
pub mod sections {
    pub const WARMUP: &str = "warmup";
    pub const VOCABULARY: &str = "vocabulary";
    pub const READING: &str = "reading";
    pub const DIALOGUE: &str = "dialogue";
    pub const GRAMMAR: &str = "grammar";
    pub const DISCUSSION: &str = "discussion";
    pub const PRONUNCIATION: &str = "pronunciation";
}
