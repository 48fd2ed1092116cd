//! Shared test utilities for integration tests
//!
//! A scripted text generator that answers every prompt the pipeline sends with valid
//! content unless a test queues something else for a section, plus recording sinks.

use async_trait::async_trait;
use lessonforge::config::GenerationConfig;
use lessonforge::error::LessonError;
use lessonforge::progress::{ProgressSink, ProgressUpdate};
use lessonforge::provider::TextGenerator;
use lessonforge::types::CefrLevel;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};

/// Seventy-odd words of plain prose about a ferry trip.
pub const SAMPLE_TEXT: &str = "Every summer the small ferry leaves the harbour at dawn and carries \
    passengers across the bay to the island. The journey takes about three hours. Families bring \
    sandwiches and flasks of tea, while students sit on the deck with their books. When the weather \
    is calm, dolphins sometimes follow the boat. On the island there is a quiet village with a \
    bakery, a museum about fishing and a long sandy beach where children build castles.";

pub const KEY_VOCABULARY: [&str; 3] = ["harbour", "ferry", "journey"];

/// Default config with near-instant retries.
pub fn fast_config() -> GenerationConfig {
    GenerationConfig {
        retry_base_delay_ms: 1,
        call_timeout_ms: 5_000,
        ..GenerationConfig::default()
    }
}

/// Answers pipeline prompts by section marker. Queued responses for a section are used
/// first; after that the section gets a valid default for `level`.
pub struct LessonScript {
    level: CefrLevel,
    queued: Mutex<HashMap<&'static str, VecDeque<Result<String, LessonError>>>>,
    prompts: Mutex<Vec<String>>,
}

impl LessonScript {
    pub fn new(level: CefrLevel) -> Self {
        Self {
            level,
            queued: Mutex::new(HashMap::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(self, section: &'static str, responses: Vec<Result<String, LessonError>>) -> Self {
        self.queued.lock().entry(section).or_default().extend(responses);
        self
    }

    /// Section generation calls seen so far, reading paragraph calls included.
    pub fn calls_for(&self, section: &str) -> usize {
        let marker = format!("Section: {}", section);
        self.prompts.lock().iter().filter(|p| p.contains(&marker)).count()
    }

    pub fn prompts_for(&self, section: &str) -> Vec<String> {
        let marker = format!("Section: {}", section);
        self.prompts
            .lock()
            .iter()
            .filter(|p| p.contains(&marker))
            .cloned()
            .collect()
    }

    fn default_for(&self, section: &str) -> Option<String> {
        let response = match section {
            "warmup" => warmup(),
            "vocabulary" => vocabulary(self.level.vocabulary_examples()),
            "reading" => paragraph(),
            "discussion" => discussion(),
            "dialogue" => dialogue(),
            _ => return None,
        };
        Some(response)
    }
}

fn section_of(prompt: &str) -> Option<&'static str> {
    ["warmup", "vocabulary", "reading", "discussion", "dialogue", "grammar", "pronunciation"]
        .into_iter()
        .find(|section| {
            prompt.contains(&format!("Section: {}\n", section))
                || prompt.contains(&format!("Section: {} (paragraph", section))
        })
}

#[async_trait]
impl TextGenerator for LessonScript {
    async fn generate(&self, prompt: &str) -> Result<String, LessonError> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(section) = section_of(prompt) {
            let queued = self.queued.lock().get_mut(section).and_then(VecDeque::pop_front);
            if let Some(response) = queued {
                return response;
            }
            return self
                .default_for(section)
                .ok_or_else(|| LessonError::ProviderError(format!("no script for {}", section)));
        }
        if prompt.starts_with("From the text") {
            return Ok(json!(KEY_VOCABULARY).to_string());
        }
        if prompt.starts_with("List the") {
            return Ok(json!(["island ferry trips", "village life"]).to_string());
        }
        if prompt.starts_with("Summarise") {
            return Ok("A ferry takes families to a quiet island village.".to_string());
        }
        Err(LessonError::ProviderError("unexpected prompt".to_string()))
    }
}

/// Fails every call with the same error.
pub struct FailingGenerator {
    error: LessonError,
    calls: Mutex<usize>,
}

impl FailingGenerator {
    pub fn new(error: LessonError) -> Self {
        Self {
            error,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, LessonError> {
        *self.calls.lock() += 1;
        Err(self.error.clone())
    }
}

pub fn warmup() -> String {
    json!([
        "Warm-up",
        "Have you ever travelled by boat?",
        "What do you like to do at the seaside?",
        "How do you usually spend your summer holidays?",
        "Would you like to live on an island?"
    ])
    .to_string()
}

pub fn vocabulary(examples: usize) -> String {
    let mut items = vec![json!("Key words")];
    items.extend(KEY_VOCABULARY.iter().map(|word| {
        json!({
            "word": word,
            "definition": format!("a learner definition of {}", word),
            "examples": (0..examples)
                .map(|i| format!("Example sentence {} with the word {}.", i + 1, word))
                .collect::<Vec<_>>(),
        })
    }));
    Value::Array(items).to_string()
}

pub fn paragraph() -> String {
    "The ferry leaves the harbour very early, and the passengers watch the sun rise over the \
     calm water while the journey to the island slowly begins."
        .to_string()
}

pub fn discussion() -> String {
    json!([
        "Discussion",
        "Why do people enjoy travelling by ferry?",
        "What would you miss if you lived on an island?",
        "How has tourism changed small villages?",
        "Is a slow journey better than a fast one?",
        "Where would you go for a quiet holiday?"
    ])
    .to_string()
}

pub fn dialogue() -> String {
    let mut items = vec![json!("At the harbour")];
    items.extend((0..12).map(|i| {
        let speaker = if i % 2 == 0 { "Ana" } else { "Ben" };
        json!({"speaker": speaker, "text": format!("Line {} about the ferry timetable.", i + 1)})
    }));
    Value::Array(items).to_string()
}

/// Records every update it receives.
#[derive(Default)]
pub struct RecordingSink {
    updates: Mutex<Vec<ProgressUpdate>>,
}

impl RecordingSink {
    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn on_progress(&self, update: &ProgressUpdate) -> Result<(), LessonError> {
        self.updates.lock().push(update.clone());
        Ok(())
    }
}

/// Errors on every update and panics on section updates.
pub struct BrokenSink;

impl ProgressSink for BrokenSink {
    fn on_progress(&self, update: &ProgressUpdate) -> Result<(), LessonError> {
        if update.section.is_some() {
            panic!("sink exploded");
        }
        Err(LessonError::GenerationFailed("sink is closed".to_string()))
    }
}

/// Serializes tests that touch config environment variables.
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Run `f` with XDG_CONFIG_HOME pointed into `temp`, so no global config file leaks in.
pub fn with_isolated_config_home<F, R>(temp: &tempfile::TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = CONFIG_ENV_MUTEX
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let original = std::env::var("XDG_CONFIG_HOME").ok();
    std::env::set_var("XDG_CONFIG_HOME", temp.path().join("xdg"));

    let result = f();

    match original {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
    result
}
