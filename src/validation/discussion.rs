//! Discussion questions: exactly five at every level.

use crate::context::SharedContext;
use crate::types::{sections, CefrLevel};
use crate::validation::{expect_count, IssueCollector, IssueType, SectionContent, SectionValidator};

pub const DISCUSSION_QUESTIONS: usize = 5;

pub struct DiscussionValidator;

impl SectionValidator for DiscussionValidator {
    fn section(&self) -> &'static str {
        sections::DISCUSSION
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
                format!("Discussion item {} is not a question string", position),
                "Write each discussion question as a plain string",
            );
        }
        let questions: Vec<&str> = questions.into_iter().filter(|q| !q.trim().is_empty()).collect();
        expect_count(issues, "discussion questions", questions.len(), DISCUSSION_QUESTIONS);

        let mut seen = std::collections::HashSet::new();
        for question in &questions {
            if !seen.insert(question.trim().to_lowercase()) {
                issues.error(
                    IssueType::StructuralError,
                    format!("Duplicate discussion question: {}", question),
                    "Make every discussion question distinct",
                );
            }
        }
    }
}
