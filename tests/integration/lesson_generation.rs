//! End-to-end lesson generation through `LessonApi::generate`

use super::test_utils::*;
use async_trait::async_trait;
use lessonforge::api::{Authenticator, GenerateRequest, Lesson, LessonApi, LessonStore, UserIdentity};
use lessonforge::config::GenerationConfig;
use lessonforge::error::LessonError;
use lessonforge::progress::ProgressSink;
use lessonforge::provider::TextGenerator;
use lessonforge::recovery::ErrorType;
use lessonforge::types::CefrLevel;
use lessonforge::validation::IssueType;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct MemoryStore {
    saved: Mutex<Vec<Lesson>>,
}

#[async_trait]
impl LessonStore for MemoryStore {
    async fn save(&self, lesson: &Lesson) -> Result<String, LessonError> {
        let mut saved = self.saved.lock();
        saved.push(lesson.clone());
        Ok(format!("lesson-{}", saved.len()))
    }
}

struct BrokenStore;

#[async_trait]
impl LessonStore for BrokenStore {
    async fn save(&self, _lesson: &Lesson) -> Result<String, LessonError> {
        Err(LessonError::PersistenceFailed("network connection reset".to_string()))
    }
}

struct StaticUser;

#[async_trait]
impl Authenticator for StaticUser {
    async fn authenticate(&self) -> Result<UserIdentity, LessonError> {
        Ok(UserIdentity {
            user_id: "user-7".to_string(),
            display_name: Some("Kim".to_string()),
        })
    }
}

fn api(script: Arc<LessonScript>) -> LessonApi {
    LessonApi::new(fast_config(), script)
}

#[tokio::test]
async fn test_discussion_lesson_generates_every_section_in_plan_order() {
    let script = Arc::new(LessonScript::new(CefrLevel::B1));
    let sink = Arc::new(RecordingSink::default());
    let api = api(script.clone());

    let result = api
        .generate(
            GenerateRequest::new(SAMPLE_TEXT, CefrLevel::B1),
            Some(sink.clone() as Arc<dyn ProgressSink>),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let names: Vec<&str> = result
        .lesson
        .sections
        .iter()
        .map(|s| s.section_name.as_str())
        .collect();
    assert_eq!(names, ["warmup", "vocabulary", "reading", "discussion", "dialogue"]);
    assert!(result.failed_sections.is_empty());
    assert!(!result.cancelled);
    assert_eq!(result.lesson.lesson_type, "discussion");
    assert_eq!(result.lesson.title, "Island ferry trips (B1)");
    assert_eq!(result.lesson.key_vocabulary, KEY_VOCABULARY);
    assert_eq!(result.lesson.target_language, "english");
    assert_eq!(result.quality_metrics.total_sections, 5);
    assert_eq!(result.quality_metrics.total_regenerations, 0);

    let reading = &result.lesson.sections[2];
    assert_eq!(reading.content.data().len(), CefrLevel::B1.reading_paragraphs());
    assert_eq!(script.calls_for("reading"), CefrLevel::B1.reading_paragraphs());

    let updates = sink.updates();
    assert!(updates.windows(2).all(|w| w[0].progress <= w[1].progress));
    let last = updates.last().unwrap();
    assert_eq!(last.progress, 100);
    assert_eq!(last.phase, "complete");
    assert!(updates
        .iter()
        .any(|u| u.section.as_deref() == Some("paragraph-1")));
}

#[tokio::test]
async fn test_b1_vocabulary_with_two_examples_is_regenerated() {
    let script = Arc::new(
        LessonScript::new(CefrLevel::B1).queue("vocabulary", vec![Ok(vocabulary(2))]),
    );
    let result = api(script.clone())
        .generate(
            GenerateRequest::new(SAMPLE_TEXT, CefrLevel::B1),
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let vocabulary = result
        .lesson
        .sections
        .iter()
        .find(|s| s.section_name == "vocabulary")
        .unwrap();
    assert_eq!(vocabulary.attempts_used, 2);
    for entry in vocabulary.content.data() {
        assert_eq!(entry["examples"].as_array().unwrap().len(), 4);
    }
    assert_eq!(result.quality_metrics.total_regenerations, 1);

    let prompts = script.prompts_for("vocabulary");
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("attempt 2"));
}

#[tokio::test]
async fn test_exhausted_section_is_accepted_with_warning() {
    let script = Arc::new(
        LessonScript::new(CefrLevel::C1)
            .queue("discussion", vec![Ok(discussion_of(3)), Ok(discussion_of(4))]),
    );
    let result = api(script)
        .generate(
            GenerateRequest::new(SAMPLE_TEXT, CefrLevel::C1),
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let discussion = result
        .lesson
        .sections
        .iter()
        .find(|s| s.section_name == "discussion")
        .unwrap();
    assert!(discussion
        .issues
        .iter()
        .any(|i| i.issue_type == IssueType::RegenerationExhausted));
    assert_eq!(result.quality_metrics.accepted_best_effort, 1);
}

fn discussion_of(n: usize) -> String {
    let mut items = vec![serde_json::json!("Discussion")];
    items.extend((0..n).map(|i| serde_json::json!(format!("Question {} about island life?", i + 1))));
    serde_json::Value::Array(items).to_string()
}

#[tokio::test]
async fn test_a1_lesson_uses_five_examples_and_three_paragraphs() {
    let script = Arc::new(LessonScript::new(CefrLevel::A1));
    let result = api(script.clone())
        .generate(
            GenerateRequest::new(SAMPLE_TEXT, CefrLevel::A1),
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(result.failed_sections.is_empty());
    let vocabulary = &result.lesson.sections[1];
    assert_eq!(vocabulary.content.data()[0]["examples"].as_array().unwrap().len(), 5);
    assert_eq!(script.calls_for("reading"), 3);
}

#[tokio::test]
async fn test_saved_lesson_carries_owner_and_store_id() {
    let store = Arc::new(MemoryStore::default());
    let api = api(Arc::new(LessonScript::new(CefrLevel::B2)))
        .with_authenticator(Arc::new(StaticUser))
        .with_store(store.clone());

    let request = GenerateRequest::new(SAMPLE_TEXT, CefrLevel::B2)
        .with_target_language("English")
        .with_metadata("source_url", serde_json::json!("https://example.com/ferry"));
    let result = api
        .generate(request, None, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.lesson.id.as_deref(), Some("lesson-1"));
    assert_eq!(result.lesson.owner.as_ref().unwrap().user_id, "user-7");
    assert_eq!(result.lesson.metadata["source_url"], "https://example.com/ferry");
    let saved = store.saved.lock();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].sections.len(), 5);
}

#[tokio::test]
async fn test_persistence_failure_reports_saving_phase() {
    let api = api(Arc::new(LessonScript::new(CefrLevel::B1))).with_store(Arc::new(BrokenStore));
    let failure = api
        .generate(
            GenerateRequest::new(SAMPLE_TEXT, CefrLevel::B1),
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.error.error_type, ErrorType::NetworkError);
    let progress = failure.progress_state.unwrap();
    assert_eq!(progress.phase, "saving");
    assert_eq!(progress.progress, 90);
}

#[tokio::test]
async fn test_failing_sink_does_not_stop_generation() {
    let api = api(Arc::new(LessonScript::new(CefrLevel::B1)));
    let result = api
        .generate(
            GenerateRequest::new(SAMPLE_TEXT, CefrLevel::B1),
            Some(Arc::new(BrokenSink)),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.lesson.sections.len(), 5);
}

#[tokio::test]
async fn test_cancelled_session_returns_unsaved_partial_lesson() {
    let store = Arc::new(MemoryStore::default());
    let api = api(Arc::new(LessonScript::new(CefrLevel::B1))).with_store(store.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = api
        .generate(GenerateRequest::new(SAMPLE_TEXT, CefrLevel::B1), None, cancel)
        .await
        .unwrap();

    assert!(result.cancelled);
    assert!(result.lesson.sections.is_empty());
    assert!(result.lesson.id.is_none());
    assert!(store.saved.lock().is_empty());
}

/// Takes fifty seconds to answer anything.
struct SlowGenerator;

#[async_trait]
impl TextGenerator for SlowGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, LessonError> {
        tokio::time::sleep(Duration::from_secs(50)).await;
        Ok(warmup())
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_context_building_returns_promptly() {
    let store = Arc::new(MemoryStore::default());
    let config = GenerationConfig {
        call_timeout_ms: 60_000,
        ..fast_config()
    };
    let api = LessonApi::new(config, Arc::new(SlowGenerator)).with_store(store.clone());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });

    let started = tokio::time::Instant::now();
    let result = api
        .generate(GenerateRequest::new(SAMPLE_TEXT, CefrLevel::B1), None, cancel)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(result.cancelled);
    assert!(result.lesson.sections.is_empty());
    assert!(store.saved.lock().is_empty());
}

#[tokio::test]
async fn test_unknown_lesson_type_falls_back_to_discussion_plan() {
    let api = api(Arc::new(LessonScript::new(CefrLevel::B1)));
    let result = api
        .generate(
            GenerateRequest::new(SAMPLE_TEXT, CefrLevel::B1).with_lesson_type("debate"),
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.lesson.lesson_type, "discussion");
    assert_eq!(result.lesson.sections.len(), 5);
}
