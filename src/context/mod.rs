//! Shared context: vocabulary, themes and summary extracted once per session and handed
//! by reference to every section generation call.

pub mod fallback;

use crate::provider::TextGenerator;
use crate::text::normalize_token;
use crate::types::CefrLevel;
use crate::validation::content::strip_code_fence;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Immutable per-session context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedContext {
    pub source_text: String,
    pub difficulty_level: CefrLevel,
    /// Ordered, never empty.
    pub key_vocabulary: Vec<String>,
    pub main_themes: Vec<String>,
    pub summary: String,
    pub target_language: String,
}

impl SharedContext {
    /// Context built from the source alone, without any service call.
    pub fn from_source(text: &str, level: CefrLevel, language: &str) -> Self {
        Self {
            source_text: text.to_string(),
            difficulty_level: level,
            key_vocabulary: fallback::vocabulary(text, ContextBuilder::VOCABULARY_SIZE),
            main_themes: fallback::themes(text, ContextBuilder::THEME_COUNT),
            summary: fallback::summary(text, ContextBuilder::SUMMARY_SENTENCES),
            target_language: language.to_string(),
        }
    }

    /// First `n` key vocabulary words, comma separated.
    pub fn vocabulary_preview(&self, n: usize) -> String {
        self.key_vocabulary
            .iter()
            .take(n)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[cfg(test)]
    pub fn for_tests(level: CefrLevel) -> Self {
        Self {
            source_text: "The ferry left the harbour at dawn and the journey took three hours."
                .to_string(),
            difficulty_level: level,
            key_vocabulary: vec![
                "harbour".to_string(),
                "ferry".to_string(),
                "journey".to_string(),
                "passenger".to_string(),
            ],
            main_themes: vec!["sea travel".to_string()],
            summary: "A ferry journey from the harbour.".to_string(),
            target_language: "english".to_string(),
        }
    }
}

/// Builds a [`SharedContext`] with three independent extraction calls. Each call falls
/// back to a deterministic heuristic on failure, timeout or an empty answer, so building
/// never fails. Cancellation abandons the calls still in flight and falls back too.
pub struct ContextBuilder {
    generator: Arc<dyn TextGenerator>,
    call_timeout: Duration,
}

impl ContextBuilder {
    pub const VOCABULARY_SIZE: usize = 10;
    pub const THEME_COUNT: usize = 3;
    pub const SUMMARY_SENTENCES: usize = 2;

    pub fn new(generator: Arc<dyn TextGenerator>, call_timeout: Duration) -> Self {
        Self {
            generator,
            call_timeout,
        }
    }

    pub async fn build(
        &self,
        text: &str,
        lesson_type: &str,
        level: CefrLevel,
        language: &str,
        cancel: &CancellationToken,
    ) -> SharedContext {
        let started = Instant::now();
        let vocabulary_prompt = vocabulary_prompt(text, lesson_type, level, language);
        let themes_prompt = themes_prompt(text, language);
        let summary_prompt = summary_prompt(text, level, language);

        let (vocabulary, themes, summary) = futures::join!(
            self.call("vocabulary extraction", &vocabulary_prompt, cancel),
            self.call("theme extraction", &themes_prompt, cancel),
            self.call("summary", &summary_prompt, cancel),
        );

        let key_vocabulary = vocabulary
            .map(|raw| parse_list(&raw, Self::VOCABULARY_SIZE))
            .filter(|words| !words.is_empty())
            .unwrap_or_else(|| fallback::vocabulary(text, Self::VOCABULARY_SIZE));
        let main_themes = themes
            .map(|raw| parse_list(&raw, Self::THEME_COUNT))
            .filter(|themes| !themes.is_empty())
            .unwrap_or_else(|| fallback::themes(text, Self::THEME_COUNT));
        let summary = summary
            .map(|raw| clean_summary(&raw))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| fallback::summary(text, Self::SUMMARY_SENTENCES));

        info!(
            vocabulary = key_vocabulary.len(),
            themes = main_themes.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "shared context built"
        );

        SharedContext {
            source_text: text.to_string(),
            difficulty_level: level,
            key_vocabulary,
            main_themes,
            summary,
            target_language: language.to_string(),
        }
    }

    async fn call(&self, operation: &str, prompt: &str, cancel: &CancellationToken) -> Option<String> {
        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(operation, "cancelled, using fallback");
                return None;
            }
            reply = tokio::time::timeout(self.call_timeout, self.generator.generate(prompt)) => reply,
        };
        match reply {
            Ok(Ok(raw)) if !raw.trim().is_empty() => Some(raw),
            Ok(Ok(_)) => {
                debug!(operation, "empty response, using fallback");
                None
            }
            Ok(Err(err)) => {
                warn!(operation, error = %err, "context extraction failed, using fallback");
                None
            }
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "context extraction timed out, using fallback"
                );
                None
            }
        }
    }
}

fn excerpt(text: &str) -> &str {
    const MAX_CHARS: usize = 4000;
    match text.char_indices().nth(MAX_CHARS) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

fn vocabulary_prompt(text: &str, lesson_type: &str, level: CefrLevel, language: &str) -> String {
    format!(
        "From the text below, pick the {} most useful {} words for a {} lesson at CEFR level {} ({}).\n\
         Answer with a JSON array of lowercase words only.\n\nTEXT:\n{}",
        ContextBuilder::VOCABULARY_SIZE,
        language,
        lesson_type,
        level,
        level.describe(),
        excerpt(text)
    )
}

fn themes_prompt(text: &str, language: &str) -> String {
    format!(
        "List the {} main themes of the text below as short {} phrases.\n\
         Answer with a JSON array of strings only.\n\nTEXT:\n{}",
        ContextBuilder::THEME_COUNT,
        language,
        excerpt(text)
    )
}

fn summary_prompt(text: &str, level: CefrLevel, language: &str) -> String {
    format!(
        "Summarise the text below in two {} sentences a {} learner can follow. \
         Answer with the summary only.\n\nTEXT:\n{}",
        language,
        level,
        excerpt(text)
    )
}

/// Parse a list answer: a JSON string array, or one entry per line or comma.
fn parse_list(raw: &str, limit: usize) -> Vec<String> {
    let body = strip_code_fence(raw.trim());
    let entries: Vec<String> = match serde_json::from_str::<Vec<String>>(body) {
        Ok(entries) => entries,
        Err(_) => body
            .split(|c| c == '\n' || c == ',')
            .map(|line| {
                line.trim()
                    .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | '*'))
                    .to_string()
            })
            .collect(),
    };

    let mut out: Vec<String> = Vec::new();
    for entry in entries {
        let cleaned = entry
            .split_whitespace()
            .map(normalize_token)
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if cleaned.is_empty() || !cleaned.chars().any(char::is_alphabetic) {
            continue;
        }
        if !out.contains(&cleaned) {
            out.push(cleaned);
        }
        if out.len() == limit {
            break;
        }
    }
    out
}

fn clean_summary(raw: &str) -> String {
    strip_code_fence(raw.trim())
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}
