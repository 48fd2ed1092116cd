//! Warm-up questions: at least three, answerable without having read the source.

use crate::context::SharedContext;
use crate::types::{sections, CefrLevel};
use crate::validation::{expect_at_least, IssueCollector, IssueType, SectionContent, SectionValidator};

const MIN_QUESTIONS: usize = 3;

/// Phrases that assume the learner already knows the source text.
const PRESUPPOSING_PHRASES: &[&str] = &[
    "in the text",
    "in the article",
    "the article",
    "the passage",
    "the story",
    "the author",
    "according to",
    "as mentioned",
    "mentioned in",
    "you read",
    "you just read",
    "the reading",
];

pub struct WarmupValidator;

impl SectionValidator for WarmupValidator {
    fn section(&self) -> &'static str {
        sections::WARMUP
    }

    fn inspect(
        &self,
        content: &SectionContent,
        _level: CefrLevel,
        _context: &SharedContext,
        issues: &mut IssueCollector,
    ) {
        let (questions, rejected) = content.string_items();
        for position in rejected {
            issues.error(
                IssueType::StructuralError,
                format!("Warm-up item {} is not a question string", position),
                "Write each warm-up question as a plain string",
            );
        }
        let questions: Vec<&str> = questions.into_iter().filter(|q| !q.trim().is_empty()).collect();
        expect_at_least(issues, "warm-up questions", questions.len(), MIN_QUESTIONS);

        for (index, question) in questions.iter().enumerate() {
            let lowered = question.to_lowercase();
            if let Some(phrase) = PRESUPPOSING_PHRASES.iter().find(|p| lowered.contains(*p)) {
                issues.error(
                    IssueType::PresupposesSource,
                    format!(
                        "Warm-up question {} refers to the source (\"{}\") before the learner has read it",
                        index + 1,
                        phrase
                    ),
                    "Ask about the learner's own experience of the topic instead",
                );
            }
            if !question.trim_end().ends_with('?') {
                issues.warning(
                    IssueType::StructuralError,
                    format!("Warm-up item {} is not phrased as a question", index + 1),
                    "End each warm-up question with a question mark",
                );
            }
        }
    }
}
