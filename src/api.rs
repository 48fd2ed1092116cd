//! Lesson generation API
//!
//! [`LessonApi::generate`] is the single entry point: gate the source text, check the
//! caller, build the shared context, run the section orchestrator, persist the lesson.
//! Progress is reported throughout; any fatal failure comes back as a
//! [`GenerationFailure`] carrying the classified error, a user message, recovery
//! options and the last progress update.

use crate::config::GenerationConfig;
use crate::context::{ContextBuilder, SharedContext};
use crate::error::LessonError;
use crate::gate::{normalize_language, ContentGate};
use crate::generation::{
    LessonPlan, OrchestrationOutcome, QualityMetrics, SectionFailure, SectionOrchestrator,
    SectionResult,
};
use crate::progress::{new_session_id, phases, ProgressBand, ProgressReporter, ProgressSink, ProgressUpdate};
use crate::provider::TextGenerator;
use crate::recovery::{
    ClassifiedError, ErrorContext, ErrorHandler, ErrorSource, ErrorType, RecoveryOption,
    SupportMessage, UserMessage,
};
use crate::types::CefrLevel;
use crate::validation::ValidatorRegistry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const DEFAULT_TARGET_LANGUAGE: &str = "english";

const INITIALIZATION: ProgressBand = ProgressBand::new(0, 5);
const VALIDATION: ProgressBand = ProgressBand::new(5, 10);
const AUTHENTICATION: ProgressBand = ProgressBand::new(10, 15);
const CONTEXT: ProgressBand = ProgressBand::new(15, 20);
const SECTIONS: ProgressBand = ProgressBand::new(20, 90);
const SAVING: ProgressBand = ProgressBand::new(90, 100);

/// Generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Source text the lesson is built from
    pub content: String,
    pub level: CefrLevel,
    /// Lesson type selecting the section plan (discussion, grammar, pronunciation, conversation)
    #[serde(default = "default_lesson_type")]
    pub lesson_type: String,
    /// Defaults to english
    #[serde(default)]
    pub target_language: Option<String>,
    /// Caller metadata copied onto the lesson
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

fn default_lesson_type() -> String {
    crate::generation::plan::DEFAULT_LESSON_TYPE.to_string()
}

impl GenerateRequest {
    pub fn new(content: impl Into<String>, level: CefrLevel) -> Self {
        Self {
            content: content.into(),
            level,
            lesson_type: default_lesson_type(),
            target_language: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_lesson_type(mut self, lesson_type: impl Into<String>) -> Self {
        self.lesson_type = lesson_type.into();
        self
    }

    pub fn with_target_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = Some(language.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Identity returned by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Authentication check performed before any generation call.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<UserIdentity, LessonError>;
}

/// Lesson persistence. Returns the stored lesson id.
#[async_trait]
pub trait LessonStore: Send + Sync {
    async fn save(&self, lesson: &Lesson) -> Result<String, LessonError>;
}

/// A generated lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Set once the lesson has been stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub lesson_type: String,
    pub level: CefrLevel,
    pub target_language: String,
    pub summary: String,
    pub key_vocabulary: Vec<String>,
    pub sections: Vec<SectionResult>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserIdentity>,
    pub created_at: DateTime<Utc>,
}

/// Successful (possibly partial) generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonResult {
    pub session_id: String,
    pub lesson: Lesson,
    pub quality_metrics: QualityMetrics,
    /// Sections that were rejected; the lesson holds the rest
    pub failed_sections: Vec<SectionFailure>,
    /// True when the session was cancelled; `lesson` holds what was accepted by then
    pub cancelled: bool,
}

/// Fatal generation failure.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{} (error id {})", .user_message.message, .error.error_id)]
pub struct GenerationFailure {
    pub error: ClassifiedError,
    pub user_message: UserMessage,
    /// At least one option is primary; manual selection is always offered
    pub recovery_options: Vec<RecoveryOption>,
    pub support: SupportMessage,
    /// Last progress update before the failure
    pub progress_state: Option<ProgressUpdate>,
}

/// Lesson generation service
///
/// Holds the long-lived collaborators. Everything session-scoped (shared context,
/// metrics, retry counters, progress) is created per [`LessonApi::generate`] call.
pub struct LessonApi {
    config: GenerationConfig,
    generator: Arc<dyn TextGenerator>,
    validators: Arc<ValidatorRegistry>,
    gate: ContentGate,
    authenticator: Option<Arc<dyn Authenticator>>,
    store: Option<Arc<dyn LessonStore>>,
}

/// Per-call state threaded through the pipeline.
struct Session<'a> {
    id: String,
    reporter: ProgressReporter,
    errors: Arc<ErrorHandler>,
    request: &'a GenerateRequest,
}

impl LessonApi {
    pub fn new(config: GenerationConfig, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            validators: Arc::new(ValidatorRegistry::with_defaults(config.min_quality_score)),
            gate: ContentGate::new(&config),
            config,
            generator,
            authenticator: None,
            store: None,
        }
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn LessonStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn gate(&self) -> &ContentGate {
        &self.gate
    }

    /// Generate a lesson.
    ///
    /// Sections that fail are reported in [`LessonResult::failed_sections`]; the call
    /// only fails outright when the gate, authentication, the plan or persistence fail,
    /// or when no section at all is accepted. Cancellation returns what was accepted.
    pub async fn generate(
        &self,
        request: GenerateRequest,
        sink: Option<Arc<dyn ProgressSink>>,
        cancel: CancellationToken,
    ) -> Result<LessonResult, GenerationFailure> {
        let session = Session {
            id: new_session_id(),
            reporter: ProgressReporter::new(sink),
            errors: Arc::new(ErrorHandler::new(&self.config)),
            request: &request,
        };
        info!(
            session_id = %session.id,
            level = %request.level,
            lesson_type = %request.lesson_type,
            words = crate::text::word_count(&request.content),
            "lesson generation started"
        );
        session.reporter.report(
            "Starting lesson generation",
            INITIALIZATION.start,
            phases::INITIALIZATION,
            None,
        );

        self.check_content(&session)?;
        let owner = self.authenticate(&session).await?;
        let language = request
            .target_language
            .as_deref()
            .and_then(normalize_language)
            .unwrap_or(DEFAULT_TARGET_LANGUAGE);

        session.reporter.report(
            "Building shared context",
            CONTEXT.start,
            phases::CONTEXT,
            None,
        );
        let context = ContextBuilder::new(
            self.generator.clone(),
            Duration::from_millis(self.config.call_timeout_ms),
        )
        .build(&request.content, &request.lesson_type, request.level, language, &cancel)
        .await;

        let plan = LessonPlan::for_lesson_type(&request.lesson_type);
        if let Err(err) = plan.validate(&self.validators) {
            let classified = session.errors.classify(
                ErrorSource::from(&err),
                ErrorContext::default().with_session(session.id.clone()),
            );
            return Err(self.fail(&session, classified, &session.id));
        }

        let orchestrator = SectionOrchestrator::new(
            self.generator.clone(),
            self.validators.clone(),
            session.errors.clone(),
            self.config.clone(),
        );
        let outcome = orchestrator
            .run(&plan, &context, &session.id, &session.reporter, SECTIONS, &cancel)
            .await;

        if outcome.accepted.is_empty() && !outcome.cancelled {
            if let Some(first) = first_failure(&plan, &outcome) {
                let key = format!("{}:{}", session.id, first.section);
                return Err(self.fail(&session, first.error.clone(), &key));
            }
        }

        let mut lesson = build_lesson(&plan, &context, &request, owner, outcome.accepted);
        if outcome.cancelled {
            warn!(
                session_id = %session.id,
                sections = lesson.sections.len(),
                "generation cancelled, returning accepted sections unsaved"
            );
        } else {
            lesson.id = self.save(&session, &lesson).await?;
            session
                .reporter
                .report("Lesson ready", 100, phases::COMPLETE, None);
        }

        info!(
            session_id = %session.id,
            sections = lesson.sections.len(),
            failed = outcome.failures.len(),
            cancelled = outcome.cancelled,
            "lesson generation finished"
        );
        Ok(LessonResult {
            session_id: session.id,
            lesson,
            quality_metrics: outcome.metrics,
            failed_sections: outcome.failures,
            cancelled: outcome.cancelled,
        })
    }

    fn check_content(&self, session: &Session<'_>) -> Result<(), GenerationFailure> {
        session
            .reporter
            .report("Validating content", VALIDATION.start, phases::VALIDATION, None);
        let result = self
            .gate
            .validate_for_language(&session.request.content, session.request.target_language.as_deref());
        if result.is_valid {
            return Ok(());
        }

        let errors: Vec<_> = result.errors().cloned().collect();
        let message = errors
            .first()
            .map(|issue| issue.message.clone())
            .unwrap_or_else(|| "Content failed validation".to_string());
        let context = ErrorContext::default()
            .with_session(session.id.clone())
            .with("phase", Value::from(phases::VALIDATION))
            .with("issues", serde_json::to_value(&errors).unwrap_or(Value::Null))
            .with("score", Value::from(result.score));
        let classified = session.errors.record(ClassifiedError::new(
            ErrorType::ContentIssue,
            false,
            ErrorSource::from(&LessonError::InvalidContent(message)),
            context,
        ));
        Err(self.fail(session, classified, &session.id))
    }

    async fn authenticate(&self, session: &Session<'_>) -> Result<Option<UserIdentity>, GenerationFailure> {
        session.reporter.report(
            "Checking account",
            AUTHENTICATION.start,
            phases::AUTHENTICATION,
            None,
        );
        let Some(authenticator) = &self.authenticator else {
            return Ok(None);
        };
        match authenticator.authenticate().await {
            Ok(identity) => Ok(Some(identity)),
            Err(err) => {
                let classified = session.errors.classify(
                    ErrorSource::from(&err),
                    ErrorContext::default()
                        .with_session(session.id.clone())
                        .with("phase", Value::from(phases::AUTHENTICATION)),
                );
                Err(self.fail(session, classified, &session.id))
            }
        }
    }

    async fn save(&self, session: &Session<'_>, lesson: &Lesson) -> Result<Option<String>, GenerationFailure> {
        session
            .reporter
            .report("Saving lesson", SAVING.start, phases::SAVING, None);
        let Some(store) = &self.store else {
            return Ok(None);
        };
        match store.save(lesson).await {
            Ok(id) => Ok(Some(id)),
            Err(err) => {
                let classified = session.errors.classify(
                    ErrorSource::from(&err),
                    ErrorContext::default()
                        .with_session(session.id.clone())
                        .with("phase", Value::from(phases::SAVING)),
                );
                Err(self.fail(session, classified, &session.id))
            }
        }
    }

    fn fail(&self, session: &Session<'_>, error: ClassifiedError, retry_key: &str) -> GenerationFailure {
        let progress_state = session.reporter.last();
        error!(
            session_id = %session.id,
            error_id = %error.error_id,
            error_type = %error.error_type,
            progress = progress_state.as_ref().map(|p| p.progress).unwrap_or(0),
            phase = progress_state.as_ref().map(|p| p.phase.as_str()).unwrap_or("-"),
            "lesson generation failed"
        );
        GenerationFailure {
            user_message: session.errors.user_message(&error),
            recovery_options: session.errors.recovery_options(&error, retry_key),
            support: session.errors.support_message(&error),
            progress_state,
            error,
        }
    }
}

/// The failure of the earliest section in plan order.
fn first_failure<'a>(plan: &LessonPlan, outcome: &'a OrchestrationOutcome) -> Option<&'a SectionFailure> {
    plan.ordered()
        .iter()
        .find_map(|spec| outcome.failures.iter().find(|f| f.section == spec.name))
        .or_else(|| outcome.failures.first())
}

fn build_lesson(
    plan: &LessonPlan,
    context: &SharedContext,
    request: &GenerateRequest,
    owner: Option<UserIdentity>,
    sections: Vec<SectionResult>,
) -> Lesson {
    let title = match context.main_themes.first() {
        Some(theme) => format!("{} ({})", capitalize(theme), request.level),
        None => format!("{} lesson ({})", capitalize(&plan.lesson_type), request.level),
    };
    Lesson {
        id: None,
        title,
        lesson_type: plan.lesson_type.clone(),
        level: request.level,
        target_language: context.target_language.clone(),
        summary: context.summary.clone(),
        key_vocabulary: context.key_vocabulary.clone(),
        sections,
        metadata: request.metadata.clone(),
        owner,
        created_at: Utc::now(),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
