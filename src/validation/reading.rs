//! Reading: the composite section. Paragraph count depends on the level.

use crate::context::SharedContext;
use crate::text::{contains_word, word_count};
use crate::types::{sections, CefrLevel};
use crate::validation::{expect_count, IssueCollector, IssueType, SectionContent, SectionValidator};

pub const MIN_PARAGRAPH_WORDS: usize = 20;

pub struct ReadingValidator;

impl SectionValidator for ReadingValidator {
    fn section(&self) -> &'static str {
        sections::READING
    }

    fn inspect(
        &self,
        content: &SectionContent,
        level: CefrLevel,
        context: &SharedContext,
        issues: &mut IssueCollector,
    ) {
        let (paragraphs, rejected) = content.string_items();
        if !rejected.is_empty() {
            issues.error(
                IssueType::StructuralError,
                format!("{} reading items are not plain paragraphs", rejected.len()),
                "Return each paragraph as plain text",
            );
        }
        expect_count(issues, "paragraphs", paragraphs.len(), level.reading_paragraphs());

        for (index, paragraph) in paragraphs.iter().enumerate() {
            let words = word_count(paragraph);
            if words < MIN_PARAGRAPH_WORDS {
                issues.error(
                    IssueType::InsufficientContent,
                    format!(
                        "Paragraph {} has {} words; at least {} are needed",
                        index + 1,
                        words,
                        MIN_PARAGRAPH_WORDS
                    ),
                    "Write fuller paragraphs",
                );
            }
        }

        let uses_vocabulary = context
            .key_vocabulary
            .iter()
            .any(|word| paragraphs.iter().any(|p| contains_word(p, word)));
        if !paragraphs.is_empty() && !uses_vocabulary {
            issues.warning(
                IssueType::MissingVocabulary,
                "Reading does not use any key vocabulary",
                "Include several key vocabulary words in the paragraphs",
            );
        }
    }
}
