//! Vocabulary: every word carries exactly the level's number of example sentences.

use crate::context::SharedContext;
use crate::types::{sections, CefrLevel};
use crate::validation::{IssueCollector, IssueType, SectionContent, SectionValidator};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyEntry {
    pub word: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default, alias = "partOfSpeech")]
    pub part_of_speech: Option<String>,
    pub examples: Vec<String>,
}

pub struct VocabularyValidator;

impl SectionValidator for VocabularyValidator {
    fn section(&self) -> &'static str {
        sections::VOCABULARY
    }

    fn inspect(
        &self,
        content: &SectionContent,
        level: CefrLevel,
        context: &SharedContext,
        issues: &mut IssueCollector,
    ) {
        let (entries, failures) = content.typed_items::<VocabularyEntry>();
        for (position, reason) in failures {
            issues.error(
                IssueType::StructuralError,
                format!("Vocabulary item {} is malformed: {}", position, reason),
                "Give each word as {\"word\", \"definition\", \"examples\": [...]}",
            );
        }
        if entries.is_empty() {
            issues.error(
                IssueType::InsufficientContent,
                "Vocabulary section has no words",
                "List the key vocabulary words from the shared context",
            );
            return;
        }

        let required = level.vocabulary_examples();
        for entry in &entries {
            if entry.word.trim().is_empty() {
                issues.error(
                    IssueType::MissingField,
                    "Vocabulary entry has an empty word",
                    "Fill in the word field",
                );
                continue;
            }
            if entry.definition.trim().is_empty() {
                issues.warning(
                    IssueType::MissingField,
                    format!("'{}' has no definition", entry.word),
                    "Add a short learner-friendly definition",
                );
            }
            let examples = entry
                .examples
                .iter()
                .filter(|e| !e.trim().is_empty())
                .count();
            if examples != required {
                issues.error(
                    IssueType::WrongCount,
                    format!(
                        "'{}' has {} example sentences; level {} requires exactly {}",
                        entry.word, examples, level, required
                    ),
                    format!("Give exactly {} example sentences per word", required),
                );
            }
        }

        let covered = context
            .key_vocabulary
            .iter()
            .filter(|word| {
                entries
                    .iter()
                    .any(|e| e.word.trim().eq_ignore_ascii_case(word.trim()))
            })
            .count();
        if covered == 0 {
            issues.recommend("Reuse words from the key vocabulary list so later sections can build on them");
        }
    }
}
