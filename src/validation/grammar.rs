//! Grammar: one grammar point with rule, form and usage filled in and at least five
//! prompt/answer exercises.

use crate::context::SharedContext;
use crate::types::{sections, CefrLevel};
use crate::validation::{expect_at_least, IssueCollector, IssueType, SectionContent, SectionValidator};
use serde::Deserialize;

pub const MIN_GRAMMAR_EXERCISES: usize = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct GrammarExercise {
    #[serde(default, alias = "question")]
    pub prompt: String,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrammarPoint {
    #[serde(default)]
    pub rule: String,
    #[serde(default)]
    pub form: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub exercises: Vec<GrammarExercise>,
}

pub struct GrammarValidator;

impl SectionValidator for GrammarValidator {
    fn section(&self) -> &'static str {
        sections::GRAMMAR
    }

    fn inspect(
        &self,
        content: &SectionContent,
        _level: CefrLevel,
        _context: &SharedContext,
        issues: &mut IssueCollector,
    ) {
        let (points, failures) = content.typed_items::<GrammarPoint>();
        for (position, reason) in failures {
            issues.error(
                IssueType::StructuralError,
                format!("Grammar item {} is malformed: {}", position, reason),
                "Give the grammar point as {\"rule\", \"form\", \"usage\", \"exercises\": [...]}",
            );
        }
        let Some(point) = points.first() else {
            issues.error(
                IssueType::InsufficientContent,
                "Grammar section has no grammar point",
                "Explain one grammar point from the source text",
            );
            return;
        };
        if points.len() > 1 {
            issues.warning(
                IssueType::StructuralError,
                format!("Grammar section has {} points; only the first is used", points.len()),
                "Focus on a single grammar point",
            );
        }

        for (field, value) in [("rule", &point.rule), ("form", &point.form), ("usage", &point.usage)] {
            if value.trim().is_empty() {
                issues.error(
                    IssueType::MissingField,
                    format!("Grammar {} is empty", field),
                    format!("Fill in the {} field", field),
                );
            }
        }

        let complete = point
            .exercises
            .iter()
            .filter(|e| !e.prompt.trim().is_empty() && !e.answer.trim().is_empty())
            .count();
        if complete < point.exercises.len() {
            issues.error(
                IssueType::MissingField,
                format!(
                    "{} grammar exercises are missing a prompt or an answer",
                    point.exercises.len() - complete
                ),
                "Give every exercise both a prompt and an answer",
            );
        }
        expect_at_least(issues, "grammar exercises", complete, MIN_GRAMMAR_EXERCISES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(exercises: usize) -> serde_json::Value {
        let exercises: Vec<serde_json::Value> = (0..exercises)
            .map(|i| json!({"prompt": format!("She ___ ({}) home.", i), "answer": "went"}))
            .collect();
        json!({
            "rule": "Past simple for finished actions",
            "form": "verb + -ed",
            "usage": "Completed events in the past",
            "exercises": exercises,
        })
    }

    fn validate(item: serde_json::Value) -> crate::validation::ValidationResult {
        let context = SharedContext::for_tests(CefrLevel::A2);
        GrammarValidator.validate(&SectionContent::new("Grammar", vec![item]), CefrLevel::A2, &context)
    }

    #[test]
    fn complete_point_passes() {
        assert!(validate(point(5)).is_valid);
    }

    #[test]
    fn too_few_exercises_fail() {
        let result = validate(point(4));
        assert!(result.has_issue(IssueType::WrongCount));
    }

    #[test]
    fn empty_form_fails() {
        let mut item = point(6);
        item["form"] = json!("");
        let result = validate(item);
        assert!(result.has_issue(IssueType::MissingField));
    }

    #[test]
    fn exercise_without_answer_does_not_count() {
        let mut item = point(5);
        item["exercises"][0]["answer"] = json!(" ");
        let result = validate(item);
        assert!(result.has_issue(IssueType::MissingField));
        assert!(result.has_issue(IssueType::WrongCount));
    }
}
