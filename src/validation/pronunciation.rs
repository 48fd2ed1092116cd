//! Pronunciation: at least five words with IPA, a tip and a practice sentence, plus at
//! least two tongue-twisters tagged with their target phonemes.

use crate::context::SharedContext;
use crate::types::{sections, CefrLevel};
use crate::validation::{expect_at_least, IssueCollector, IssueType, SectionContent, SectionValidator};
use serde::Deserialize;

pub const MIN_PRONUNCIATION_WORDS: usize = 5;
pub const MIN_TONGUE_TWISTERS: usize = 2;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PronunciationItem {
    Word {
        word: String,
        ipa: String,
        #[serde(default)]
        tips: Vec<String>,
        #[serde(default, alias = "practiceSentence")]
        practice_sentence: String,
    },
    TongueTwister {
        text: String,
        #[serde(default, alias = "targetPhonemes")]
        target_phonemes: Vec<String>,
    },
}

pub struct PronunciationValidator;

impl SectionValidator for PronunciationValidator {
    fn section(&self) -> &'static str {
        sections::PRONUNCIATION
    }

    fn inspect(
        &self,
        content: &SectionContent,
        _level: CefrLevel,
        _context: &SharedContext,
        issues: &mut IssueCollector,
    ) {
        let (items, failures) = content.typed_items::<PronunciationItem>();
        for (position, _) in failures {
            issues.error(
                IssueType::StructuralError,
                format!("Pronunciation item {} is neither a word nor a tongue-twister", position),
                "Use {\"word\", \"ipa\", \"tips\", \"practice_sentence\"} or {\"text\", \"target_phonemes\"}",
            );
        }

        let mut words = 0;
        let mut twisters = 0;
        for item in &items {
            match item {
                PronunciationItem::Word {
                    word,
                    ipa,
                    tips,
                    practice_sentence,
                } => {
                    words += 1;
                    if !looks_like_ipa(ipa) {
                        issues.error(
                            IssueType::MissingField,
                            format!("'{}' has no IPA transcription", word),
                            "Give an IPA transcription between slashes, e.g. /ˈhɑːbə/",
                        );
                    }
                    if tips.iter().all(|t| t.trim().is_empty()) {
                        issues.error(
                            IssueType::MissingField,
                            format!("'{}' has no pronunciation tip", word),
                            "Add at least one tip per word",
                        );
                    }
                    if practice_sentence.trim().is_empty() {
                        issues.error(
                            IssueType::MissingField,
                            format!("'{}' has no practice sentence", word),
                            "Add a practice sentence using the word",
                        );
                    }
                }
                PronunciationItem::TongueTwister {
                    text,
                    target_phonemes,
                } => {
                    twisters += 1;
                    if target_phonemes.iter().all(|p| p.trim().is_empty()) {
                        issues.error(
                            IssueType::MissingField,
                            format!("Tongue-twister \"{}\" has no target phonemes", text),
                            "Tag each tongue-twister with the phonemes it practises",
                        );
                    }
                }
            }
        }
        expect_at_least(issues, "pronunciation words", words, MIN_PRONUNCIATION_WORDS);
        expect_at_least(issues, "tongue-twisters", twisters, MIN_TONGUE_TWISTERS);
    }
}

fn looks_like_ipa(ipa: &str) -> bool {
    let trimmed = ipa.trim();
    let inner = trimmed.trim_matches(|c| c == '/' || c == '[' || c == ']');
    !inner.trim().is_empty()
}
