//! Section prompt construction.
//!
//! Prompts are a pure function of the shared context, the section and an optional
//! [`RegenerationContext`] describing what was wrong with the previous attempt.

use crate::context::SharedContext;
use crate::error::LessonError;
use crate::types::sections::{
    DIALOGUE, DISCUSSION, GRAMMAR, PRONUNCIATION, READING, VOCABULARY, WARMUP,
};
use crate::validation::dialogue::MIN_DIALOGUE_LINES;
use crate::validation::discussion::DISCUSSION_QUESTIONS;
use crate::validation::grammar::MIN_GRAMMAR_EXERCISES;
use crate::validation::pronunciation::{MIN_PRONUNCIATION_WORDS, MIN_TONGUE_TWISTERS};
use crate::validation::reading::MIN_PARAGRAPH_WORDS;
use crate::validation::{ValidationIssue, ValidationResult};
use serde::{Deserialize, Serialize};

const VOCABULARY_WORDS: usize = 6;
const WARMUP_QUESTIONS: usize = 4;

/// Feedback carried from a rejected attempt into the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerationContext {
    /// Attempt number about to run (2 for the first regeneration).
    pub attempt: u32,
    pub previous_issues: Vec<ValidationIssue>,
    pub feedback: String,
}

impl RegenerationContext {
    pub fn from_validation(attempt: u32, result: &ValidationResult) -> Self {
        Self {
            attempt,
            previous_issues: result.errors().cloned().collect(),
            feedback: result.feedback(),
        }
    }

    fn render(&self) -> String {
        format!(
            "\n\nThis is attempt {}. The previous answer was rejected:\n{}\nFix every problem listed above.",
            self.attempt, self.feedback
        )
    }
}

fn header(context: &SharedContext) -> String {
    format!(
        "You are writing part of a {language} lesson for learners at CEFR level {level} ({describe}).\n\
         Lesson summary: {summary}\n\
         Main themes: {themes}\n\
         Key vocabulary: {vocabulary}\n",
        language = context.target_language,
        level = context.difficulty_level,
        describe = context.difficulty_level.describe(),
        summary = context.summary,
        themes = context.main_themes.join(", "),
        vocabulary = context.vocabulary_preview(context.key_vocabulary.len()),
    )
}

const JSON_RULES: &str = "Answer with a JSON array only. The first element is the section title as a string; \
     the remaining elements are the items described below.";

/// Prompt for a whole section. `reading` is generated per paragraph instead.
pub fn section_prompt(
    section: &str,
    context: &SharedContext,
    regeneration: Option<&RegenerationContext>,
) -> Result<String, LessonError> {
    let level = context.difficulty_level;
    let body = match section {
        WARMUP => format!(
            "Write {} warm-up questions that introduce the lesson themes. Each item is a question string. \
             Learners have not read anything yet, so do not refer to a text, article or author.",
            WARMUP_QUESTIONS
        ),
        VOCABULARY => format!(
            "Teach {} of the key vocabulary words. Each item is an object \
             {{\"word\": string, \"definition\": string, \"examples\": [string]}} with exactly {} example sentences.",
            VOCABULARY_WORDS,
            level.vocabulary_examples()
        ),
        DIALOGUE => format!(
            "Write a dialogue of at least {} lines between two speakers, A and B, who strictly take turns. \
             Each item is an object {{\"speaker\": string, \"text\": string}}. Use several key vocabulary words.",
            MIN_DIALOGUE_LINES
        ),
        GRAMMAR => format!(
            "Explain one grammar point that fits the themes. The single item is an object \
             {{\"rule\": string, \"form\": string, \"usage\": string, \"exercises\": [{{\"prompt\": string, \"answer\": string}}]}} \
             with at least {} exercises.",
            MIN_GRAMMAR_EXERCISES
        ),
        DISCUSSION => format!(
            "Write exactly {} open discussion questions about the themes. Each item is a question string.",
            DISCUSSION_QUESTIONS
        ),
        PRONUNCIATION => format!(
            "Write a pronunciation practice. Include at least {} word items \
             {{\"word\": string, \"ipa\": string, \"tips\": [string], \"practice_sentence\": string}} \
             with IPA between slashes, then at least {} tongue twister items \
             {{\"text\": string, \"target_phonemes\": [string]}}.",
            MIN_PRONUNCIATION_WORDS, MIN_TONGUE_TWISTERS
        ),
        READING => {
            return Err(LessonError::InvalidPlan(
                "reading is generated paragraph by paragraph".to_string(),
            ))
        }
        other => return Err(LessonError::UnknownSection(other.to_string())),
    };

    let mut prompt = format!("{}\nSection: {}\n{}\n{}", header(context), section, body, JSON_RULES);
    if let Some(regeneration) = regeneration {
        prompt.push_str(&regeneration.render());
    }
    Ok(prompt)
}

/// Prompt for paragraph `index` (1-based) of the reading section.
pub fn reading_paragraph_prompt(
    context: &SharedContext,
    index: usize,
    total: usize,
    previous: &[String],
    regeneration: Option<&RegenerationContext>,
) -> String {
    let mut prompt = format!(
        "{}\nSection: {} (paragraph {} of {})\n\
         Write one paragraph of at least {} words in {} that continues the reading text. \
         Use some key vocabulary. Answer with the paragraph text only, no title and no JSON.",
        header(context),
        READING,
        index,
        total,
        MIN_PARAGRAPH_WORDS,
        context.target_language,
    );
    if !previous.is_empty() {
        prompt.push_str("\n\nParagraphs so far:\n");
        prompt.push_str(&previous.join("\n\n"));
    }
    if let Some(regeneration) = regeneration {
        prompt.push_str(&regeneration.render());
    }
    prompt
}

/// Strip fences, quotes and a leading "Paragraph N:" label from a paragraph answer.
pub fn clean_paragraph(raw: &str) -> String {
    let body = crate::validation::content::strip_code_fence(raw.trim());
    let body = body.trim().trim_matches('"').trim();
    let lower = body.to_ascii_lowercase();
    if lower.starts_with("paragraph") {
        if let Some((label, rest)) = body.split_once(':') {
            if label.len() <= "paragraph 10".len() {
                return rest.trim().to_string();
            }
        }
    }
    body.to_string()
}
