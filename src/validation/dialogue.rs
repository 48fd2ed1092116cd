//! Dialogue: at least twelve lines, two strictly alternating speakers, and at least one
//! key vocabulary word in use.

use crate::context::SharedContext;
use crate::text::contains_word;
use crate::types::{sections, CefrLevel};
use crate::validation::{expect_at_least, IssueCollector, IssueType, SectionContent, SectionValidator};
use serde::Deserialize;

pub const MIN_DIALOGUE_LINES: usize = 12;

#[derive(Debug, Clone, Deserialize)]
pub struct DialogueLine {
    pub speaker: String,
    #[serde(alias = "line")]
    pub text: String,
}

pub struct DialogueValidator;

impl SectionValidator for DialogueValidator {
    fn section(&self) -> &'static str {
        sections::DIALOGUE
    }

    fn inspect(
        &self,
        content: &SectionContent,
        _level: CefrLevel,
        context: &SharedContext,
        issues: &mut IssueCollector,
    ) {
        let (lines, failures) = content.typed_items::<DialogueLine>();
        for (position, reason) in failures {
            issues.error(
                IssueType::StructuralError,
                format!("Dialogue line {} is malformed: {}", position, reason),
                "Give each line as {\"speaker\", \"text\"}",
            );
        }
        expect_at_least(issues, "dialogue lines", lines.len(), MIN_DIALOGUE_LINES);
        if lines.is_empty() {
            return;
        }

        let mut speakers: Vec<&str> = Vec::new();
        for line in &lines {
            let speaker = line.speaker.trim();
            if !speakers.contains(&speaker) {
                speakers.push(speaker);
            }
        }
        if speakers.len() != 2 {
            issues.error(
                IssueType::StructuralError,
                format!(
                    "Dialogue must have exactly two speakers, found {}",
                    speakers.len()
                ),
                "Use the same two speaker names throughout",
            );
        } else if let Some(index) = lines
            .windows(2)
            .position(|pair| pair[0].speaker.trim() == pair[1].speaker.trim())
        {
            issues.error(
                IssueType::StructuralError,
                format!(
                    "Speakers do not alternate: lines {} and {} are both {}",
                    index + 1,
                    index + 2,
                    lines[index].speaker.trim()
                ),
                "Alternate strictly between the two speakers",
            );
        }

        if let Some(position) = lines.iter().position(|l| l.text.trim().is_empty()) {
            issues.error(
                IssueType::MissingField,
                format!("Dialogue line {} is empty", position + 1),
                "Give every line some text",
            );
        }

        let uses_vocabulary = context
            .key_vocabulary
            .iter()
            .any(|word| lines.iter().any(|l| contains_word(&l.text, word)));
        if !uses_vocabulary {
            issues.error(
                IssueType::MissingVocabulary,
                "Dialogue does not use any of the key vocabulary",
                format!(
                    "Work some of these words into the dialogue: {}",
                    context.vocabulary_preview(6)
                ),
            );
        }
    }
}
