//! Section orchestrator: drives every section of a plan through
//! generate -> validate -> (accept | regenerate | reject).
//!
//! Sections whose dependencies are accepted run concurrently, bounded by
//! `max_concurrent_sections`. A section whose dependency was rejected is rejected
//! without calling the service. Cancellation stops scheduling, drops in-flight calls
//! and keeps whatever was already accepted.

use crate::config::{ExhaustedPolicy, GenerationConfig};
use crate::context::SharedContext;
use crate::error::LessonError;
use crate::generation::metrics::QualityMetrics;
use crate::generation::plan::{LessonPlan, SectionSpec};
use crate::generation::prompts::{
    clean_paragraph, reading_paragraph_prompt, section_prompt, RegenerationContext,
};
use crate::progress::{ProgressBand, ProgressReporter};
use crate::provider::TextGenerator;
use crate::recovery::{ClassifiedError, ErrorContext, ErrorHandler, ErrorSource, ErrorType};
use crate::types::sections::READING;
use crate::validation::{
    IssueType, SectionContent, Severity, ValidationIssue, ValidationResult, ValidatorRegistry,
};
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// An accepted section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionResult {
    pub section_name: String,
    pub content: SectionContent,
    /// Validator score rescaled into [0, 1].
    pub quality_score: f64,
    pub attempts_used: u32,
    /// Warnings from the accepted attempt; best-effort acceptances also carry the
    /// errors that were never fixed.
    pub issues: Vec<ValidationIssue>,
}

/// A rejected section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionFailure {
    pub section: String,
    pub error: ClassifiedError,
}

#[derive(Debug, Clone)]
pub struct OrchestrationOutcome {
    /// Accepted sections in plan order.
    pub accepted: Vec<SectionResult>,
    pub failures: Vec<SectionFailure>,
    pub metrics: QualityMetrics,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionState {
    Pending,
    Running,
    Accepted,
    Rejected,
}

struct Attempt {
    content: SectionContent,
    validation: ValidationResult,
    attempt: u32,
}

/// Progress bookkeeping shared by concurrently running sections.
struct SectionProgress<'a> {
    reporter: &'a ProgressReporter,
    band: ProgressBand,
    total: usize,
    finished: Mutex<usize>,
}

impl SectionProgress<'_> {
    fn started(&self, section: &str, attempt: u32) {
        let step = if attempt > 1 {
            format!("Regenerating {} (attempt {})", section, attempt)
        } else {
            format!("Generating {}", section)
        };
        let done = *self.finished.lock();
        self.reporter.report(step, self.band.at(done, self.total), section, None);
    }

    fn paragraph(&self, index: usize, paragraphs: usize) {
        let done = *self.finished.lock();
        let within = (index - 1) as f64 / paragraphs.max(1) as f64;
        let label = format!("paragraph-{}", index);
        self.reporter.report(
            format!("Writing reading paragraph {} of {}", index, paragraphs),
            self.band.at_fraction(done as f64 + within, self.total),
            READING,
            Some(&label),
        );
    }

    fn section_done(&self, section: &str, accepted: bool) {
        let done = {
            let mut finished = self.finished.lock();
            *finished += 1;
            *finished
        };
        let step = if accepted {
            format!("Finished {}", section)
        } else {
            format!("Skipped {}", section)
        };
        self.reporter.report(step, self.band.at(done, self.total), section, None);
    }
}

pub struct SectionOrchestrator {
    generator: Arc<dyn TextGenerator>,
    validators: Arc<ValidatorRegistry>,
    errors: Arc<ErrorHandler>,
    config: GenerationConfig,
    metrics: Mutex<QualityMetrics>,
}

impl SectionOrchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        validators: Arc<ValidatorRegistry>,
        errors: Arc<ErrorHandler>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            generator,
            validators,
            errors,
            config,
            metrics: Mutex::new(QualityMetrics::default()),
        }
    }

    /// Snapshot of the metrics so far.
    pub fn metrics(&self) -> QualityMetrics {
        self.metrics.lock().clone()
    }

    pub async fn run(
        &self,
        plan: &LessonPlan,
        context: &SharedContext,
        session_id: &str,
        reporter: &ProgressReporter,
        band: ProgressBand,
        cancel: &CancellationToken,
    ) -> OrchestrationOutcome {
        let started = Instant::now();
        let ordered = plan.ordered();
        let progress = SectionProgress {
            reporter,
            band,
            total: ordered.len(),
            finished: Mutex::new(0),
        };
        let max_concurrent = self.config.max_concurrent_sections.max(1);

        let mut states: HashMap<&str, SectionState> = ordered
            .iter()
            .map(|spec| (spec.name.as_str(), SectionState::Pending))
            .collect();
        let mut accepted: HashMap<String, SectionResult> = HashMap::new();
        let mut failures: Vec<SectionFailure> = Vec::new();
        let mut running = FuturesUnordered::new();
        let mut cancelled = cancel.is_cancelled();

        while !cancelled {
            // Reject dependents of rejected sections until nothing changes.
            loop {
                let blocked: Vec<(&SectionSpec, Vec<String>)> = ordered
                    .iter()
                    .filter(|spec| states.get(spec.name.as_str()) == Some(&SectionState::Pending))
                    .filter_map(|spec| {
                        let rejected: Vec<String> = spec
                            .dependencies
                            .iter()
                            .filter(|dep| states.get(dep.as_str()) == Some(&SectionState::Rejected))
                            .cloned()
                            .collect();
                        (!rejected.is_empty()).then_some((*spec, rejected))
                    })
                    .collect();
                if blocked.is_empty() {
                    break;
                }
                for (spec, missing) in blocked {
                    let failure = self.dependency_failure(spec, missing, session_id);
                    states.insert(spec.name.as_str(), SectionState::Rejected);
                    self.metrics.lock().record_failed();
                    progress.section_done(&spec.name, false);
                    failures.push(failure);
                }
            }

            for spec in &ordered {
                if running.len() >= max_concurrent {
                    break;
                }
                if states.get(spec.name.as_str()) != Some(&SectionState::Pending) {
                    continue;
                }
                let ready = spec
                    .dependencies
                    .iter()
                    .all(|dep| states.get(dep.as_str()) == Some(&SectionState::Accepted));
                if ready {
                    states.insert(spec.name.as_str(), SectionState::Running);
                    let spec: &SectionSpec = spec;
                    let progress = &progress;
                    running.push(async move {
                        let outcome = self.generate_section(spec, context, session_id, progress).await;
                        (spec, outcome)
                    });
                }
            }

            if running.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                }
                Some((spec, outcome)) = running.next() => {
                    match outcome {
                        Ok(result) => {
                            states.insert(spec.name.as_str(), SectionState::Accepted);
                            progress.section_done(&spec.name, true);
                            accepted.insert(spec.name.clone(), result);
                        }
                        Err(failure) => {
                            states.insert(spec.name.as_str(), SectionState::Rejected);
                            self.metrics.lock().record_failed();
                            progress.section_done(&spec.name, false);
                            failures.push(failure);
                        }
                    }
                }
            }
        }

        if cancelled {
            let abandoned = running.len();
            drop(running);
            info!(
                session_id,
                accepted = accepted.len(),
                abandoned,
                "generation cancelled, keeping accepted sections"
            );
        } else {
            // Left pending only when a dependency never became runnable, e.g. it is not in the plan.
            for spec in &ordered {
                if states.get(spec.name.as_str()) != Some(&SectionState::Pending) {
                    continue;
                }
                let missing: Vec<String> = spec
                    .dependencies
                    .iter()
                    .filter(|dep| states.get(dep.as_str()) != Some(&SectionState::Accepted))
                    .cloned()
                    .collect();
                warn!(session_id, section = %spec.name, ?missing, "section never became ready");
                failures.push(self.dependency_failure(spec, missing, session_id));
                self.metrics.lock().record_failed();
                progress.section_done(&spec.name, false);
            }
        }

        let accepted: Vec<SectionResult> = ordered
            .iter()
            .filter_map(|spec| accepted.remove(&spec.name))
            .collect();

        let metrics = {
            let mut metrics = self.metrics.lock();
            metrics.add_generation_time(started.elapsed());
            metrics.clone()
        };
        info!(
            session_id,
            accepted = accepted.len(),
            failed = failures.len(),
            regenerations = metrics.total_regenerations,
            average_quality = metrics.average_quality_score,
            duration_ms = metrics.total_generation_time.as_millis() as u64,
            "sections finished"
        );

        OrchestrationOutcome {
            accepted,
            failures,
            metrics,
            cancelled,
        }
    }

    async fn generate_section(
        &self,
        spec: &SectionSpec,
        context: &SharedContext,
        session_id: &str,
        progress: &SectionProgress<'_>,
    ) -> Result<SectionResult, SectionFailure> {
        let section = spec.name.as_str();
        let level = context.difficulty_level;
        let retry_key = format!("{}:{}", session_id, section);
        let max_attempts = self.config.max_section_attempts.max(1);
        let mut best: Option<Attempt> = None;
        let mut regeneration: Option<RegenerationContext> = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                self.metrics.lock().record_regeneration();
            }
            progress.started(section, attempt);
            let started = Instant::now();

            let (content, validation) = if section == READING {
                let content = self
                    .generate_reading(context, attempt, regeneration.as_ref(), &retry_key, session_id, progress)
                    .await
                    .map_err(|error| failure(section, error))?;
                let validation = self
                    .validators
                    .validate(section, &content, level, context)
                    .map_err(|e| failure(section, self.classify(&e, section, attempt, session_id)))?;
                (content, validation)
            } else {
                let prompt = section_prompt(section, context, regeneration.as_ref())
                    .map_err(|e| failure(section, self.classify(&e, section, attempt, session_id)))?;
                let raw = self
                    .call_with_retry(&prompt, &retry_key, section, attempt, session_id)
                    .await
                    .map_err(|error| failure(section, error))?;
                self.validators
                    .validate_raw(section, &raw, level, context)
                    .map_err(|e| failure(section, self.classify(&e, section, attempt, session_id)))?
            };

            debug!(
                section,
                attempt,
                score = validation.score,
                valid = validation.is_valid,
                issues = validation.issues.len(),
                duration_ms = started.elapsed().as_millis() as u64,
                "section validated"
            );

            if validation.has_unrecoverable() {
                return Err(failure(section, self.unsafe_content(&validation, section, attempt, session_id)));
            }

            let acceptable = validation.is_valid
                && (!self.config.strict_mode || validation.meets_minimum_quality);
            if acceptable && has_items(&content) {
                let result = SectionResult {
                    section_name: section.to_string(),
                    content,
                    quality_score: validation.quality_score(),
                    attempts_used: attempt,
                    issues: validation.issues,
                };
                self.metrics.lock().record_accepted(result.quality_score, false);
                info!(section, attempt, score = validation.score, "section accepted");
                return Ok(result);
            }

            regeneration = Some(RegenerationContext::from_validation(attempt + 1, &validation));
            let replace = has_items(&content)
                && best
                    .as_ref()
                    .map_or(true, |b| validation.score > b.validation.score);
            if replace {
                best = Some(Attempt {
                    content,
                    validation,
                    attempt,
                });
            }
        }

        self.exhausted(section, max_attempts, best, regeneration, session_id)
    }

    fn exhausted(
        &self,
        section: &str,
        max_attempts: u32,
        best: Option<Attempt>,
        last: Option<RegenerationContext>,
        session_id: &str,
    ) -> Result<SectionResult, SectionFailure> {
        match (self.config.exhausted_policy, best) {
            (ExhaustedPolicy::AcceptBest, Some(best)) => {
                let mut issues = best.validation.issues;
                issues.push(ValidationIssue {
                    issue_type: IssueType::RegenerationExhausted,
                    message: format!(
                        "Accepted best attempt ({} of {}) after validation kept failing",
                        best.attempt, max_attempts
                    ),
                    severity: Severity::Warning,
                    suggested_action: "Review this section before publishing".to_string(),
                    recoverable: true,
                });
                let quality_score = f64::from(best.validation.score) / 100.0;
                self.metrics.lock().record_accepted(quality_score, true);
                warn!(
                    section,
                    attempts = max_attempts,
                    score = best.validation.score,
                    "regeneration exhausted, accepting best attempt"
                );
                Ok(SectionResult {
                    section_name: section.to_string(),
                    content: best.content,
                    quality_score,
                    attempts_used: max_attempts,
                    issues,
                })
            }
            (_, _) => {
                let feedback = last.map(|r| r.feedback).unwrap_or_default();
                let error = LessonError::InvalidContent(format!(
                    "Section '{}' failed validation after {} attempts: {}",
                    section, max_attempts, feedback
                ));
                Err(failure(
                    section,
                    self.classify(&error, section, max_attempts, session_id),
                ))
            }
        }
    }

    async fn generate_reading(
        &self,
        context: &SharedContext,
        attempt: u32,
        regeneration: Option<&RegenerationContext>,
        retry_key: &str,
        session_id: &str,
        progress: &SectionProgress<'_>,
    ) -> Result<SectionContent, ClassifiedError> {
        let total = context.difficulty_level.reading_paragraphs();
        let mut paragraphs: Vec<String> = Vec::with_capacity(total);
        for index in 1..=total {
            progress.paragraph(index, total);
            let prompt = reading_paragraph_prompt(context, index, total, &paragraphs, regeneration);
            let raw = self
                .call_with_retry(&prompt, retry_key, READING, attempt, session_id)
                .await?;
            let paragraph = clean_paragraph(&raw);
            if paragraph.is_empty() {
                debug!(index, "empty reading paragraph");
                continue;
            }
            paragraphs.push(paragraph);
        }
        let title = match context.main_themes.first() {
            Some(theme) => format!("Reading: {}", theme),
            None => "Reading".to_string(),
        };
        Ok(SectionContent::new(
            title,
            paragraphs.into_iter().map(Value::String).collect(),
        ))
    }

    /// One service call with the per-call timeout, retried with backoff while the
    /// classified failure allows it.
    async fn call_with_retry(
        &self,
        prompt: &str,
        retry_key: &str,
        section: &str,
        attempt: u32,
        session_id: &str,
    ) -> Result<String, ClassifiedError> {
        let timeout = Duration::from_millis(self.config.call_timeout_ms);
        let retry = self.errors.retry_manager();
        loop {
            let error = match tokio::time::timeout(timeout, self.generator.generate(prompt)).await {
                Ok(Ok(text)) => {
                    retry.clear_retry_attempts(retry_key);
                    return Ok(text);
                }
                Ok(Err(err)) => err,
                Err(_) => LessonError::Timeout {
                    operation: format!("generate {}", section),
                    timeout_ms: self.config.call_timeout_ms,
                },
            };

            let classified = self.classify(&error, section, attempt, session_id);
            if !self.errors.can_retry(&classified, retry_key) {
                return Err(classified);
            }
            let delay = retry.retry_delay(retry_key);
            let retries = retry.record_retry_attempt(retry_key);
            warn!(
                section,
                attempt,
                retries,
                error_id = %classified.error_id,
                delay_ms = delay.as_millis() as u64,
                "retrying text service call"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn classify(&self, error: &LessonError, section: &str, attempt: u32, session_id: &str) -> ClassifiedError {
        self.errors.classify(
            ErrorSource::from(error),
            ErrorContext::section(section, attempt).with_session(session_id),
        )
    }

    fn unsafe_content(
        &self,
        validation: &ValidationResult,
        section: &str,
        attempt: u32,
        session_id: &str,
    ) -> ClassifiedError {
        let reason = validation
            .errors()
            .find(|issue| !issue.recoverable)
            .map(|issue| issue.message.clone())
            .unwrap_or_else(|| "unrecoverable content problem".to_string());
        let source = ErrorSource::from(&LessonError::InvalidContent(format!(
            "content safety check failed: {}",
            reason
        )));
        let context = ErrorContext::section(section, attempt)
            .with_session(session_id)
            .with("score", Value::from(validation.score));
        self.errors
            .record(ClassifiedError::new(ErrorType::ContentIssue, false, source, context))
    }

    fn dependency_failure(&self, spec: &SectionSpec, missing: Vec<String>, session_id: &str) -> SectionFailure {
        let error = LessonError::DependencyNotSatisfied {
            section: spec.name.clone(),
            missing,
        };
        let context = ErrorContext::section(spec.name.clone(), 0).with_session(session_id);
        let classified = self.errors.record(ClassifiedError::new(
            ErrorType::ContentIssue,
            false,
            ErrorSource::from(&error),
            context,
        ));
        failure(&spec.name, classified)
    }
}

fn has_items(content: &SectionContent) -> bool {
    !content.data().is_empty()
}

fn failure(section: &str, error: ClassifiedError) -> SectionFailure {
    SectionFailure {
        section: section.to_string(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CefrLevel;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers prompts for a section from a queue; prompts for other sections get a valid default.
    struct Scripted {
        section: &'static str,
        responses: Mutex<VecDeque<Result<String, LessonError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(section: &'static str, responses: Vec<Result<String, LessonError>>) -> Self {
            Self {
                section,
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls_for(&self, section: &str) -> usize {
            let marker = format!("Section: {}", section);
            self.prompts.lock().iter().filter(|p| p.contains(&marker)).count()
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, prompt: &str) -> Result<String, LessonError> {
            self.prompts.lock().push(prompt.to_string());
            if prompt.contains(&format!("Section: {}\n", self.section)) {
                if let Some(response) = self.responses.lock().pop_front() {
                    return response;
                }
            }
            Ok(warmup())
        }
    }

    fn warmup() -> String {
        json!([
            "Warm-up",
            "Have you ever travelled by boat?",
            "What do you like about the sea?",
            "How do you usually get to work?"
        ])
        .to_string()
    }

    fn vocabulary(examples: usize) -> String {
        let entries: Vec<Value> = ["harbour", "ferry", "journey"]
            .iter()
            .map(|word| {
                json!({
                    "word": word,
                    "definition": format!("meaning of {}", word),
                    "examples": (0..examples).map(|i| format!("Sentence {} uses {}.", i + 1, word)).collect::<Vec<_>>(),
                })
            })
            .collect();
        let mut items = vec![json!("Vocabulary")];
        items.extend(entries);
        Value::Array(items).to_string()
    }

    fn plan(sections: Vec<SectionSpec>) -> LessonPlan {
        LessonPlan {
            lesson_type: "custom".to_string(),
            sections,
        }
    }

    fn orchestrator(generator: Arc<dyn TextGenerator>, config: GenerationConfig) -> SectionOrchestrator {
        SectionOrchestrator::new(
            generator,
            Arc::new(ValidatorRegistry::with_defaults(config.min_quality_score)),
            Arc::new(ErrorHandler::new(&config)),
            config,
        )
    }

    async fn run(orchestrator: &SectionOrchestrator, plan: &LessonPlan, level: CefrLevel) -> OrchestrationOutcome {
        orchestrator
            .run(
                plan,
                &SharedContext::for_tests(level),
                "sess-test",
                &ProgressReporter::silent(),
                ProgressBand::new(20, 90),
                &CancellationToken::new(),
            )
            .await
    }

    #[tokio::test]
    async fn invalid_first_attempt_is_regenerated_with_feedback() {
        let generator = Arc::new(Scripted::new(
            "vocabulary",
            vec![Ok(vocabulary(2)), Ok(vocabulary(4))],
        ));
        let orchestrator = orchestrator(generator.clone(), GenerationConfig::default());
        let plan = plan(vec![SectionSpec::new("vocabulary", 0, &[])]);

        let outcome = run(&orchestrator, &plan, CefrLevel::B1).await;
        assert_eq!(outcome.accepted.len(), 1);
        let result = &outcome.accepted[0];
        assert_eq!(result.attempts_used, 2);
        assert_eq!(result.content.data()[0]["examples"].as_array().unwrap().len(), 4);
        assert_eq!(outcome.metrics.total_regenerations, 1);
        assert_eq!(outcome.metrics.total_sections, 1);

        let prompts = generator.prompts.lock();
        assert!(prompts[1].contains("attempt 2"));
    }

    #[tokio::test]
    async fn exhausted_attempts_accept_best_effort() {
        let generator = Arc::new(Scripted::new(
            "vocabulary",
            vec![Ok(vocabulary(2)), Ok(vocabulary(3))],
        ));
        let orchestrator = orchestrator(generator, GenerationConfig::default());
        let outcome = run(&orchestrator, &plan(vec![SectionSpec::new("vocabulary", 0, &[])]), CefrLevel::B1).await;

        let result = &outcome.accepted[0];
        assert_eq!(result.attempts_used, 2);
        assert!(result
            .issues
            .iter()
            .any(|i| i.issue_type == IssueType::RegenerationExhausted));
        assert_eq!(outcome.metrics.accepted_best_effort, 1);
    }

    #[tokio::test]
    async fn reject_policy_cascades_to_dependents_without_calls() {
        let generator = Arc::new(Scripted::new(
            "vocabulary",
            vec![Ok(vocabulary(2)), Ok(vocabulary(2))],
        ));
        let config = GenerationConfig {
            exhausted_policy: ExhaustedPolicy::Reject,
            ..GenerationConfig::default()
        };
        let orchestrator = orchestrator(generator.clone(), config);
        let plan = plan(vec![
            SectionSpec::new("warmup", 0, &[]),
            SectionSpec::new("vocabulary", 1, &[]),
            SectionSpec::new("dialogue", 2, &["vocabulary"]),
        ]);

        let outcome = run(&orchestrator, &plan, CefrLevel::B1).await;
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].section_name, "warmup");
        assert_eq!(outcome.failures.len(), 2);
        let dialogue = outcome.failures.iter().find(|f| f.section == "dialogue").unwrap();
        assert!(dialogue.error.message().contains("dependencies not accepted"));
        assert_eq!(generator.calls_for("dialogue"), 0);
        assert_eq!(outcome.metrics.failed_sections, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_are_retried_with_backoff() {
        let generator = Arc::new(Scripted::new(
            "warmup",
            vec![
                Err(LessonError::ProviderRequestFailed("connection reset".to_string())),
                Ok(warmup()),
            ],
        ));
        let orchestrator = orchestrator(generator.clone(), GenerationConfig::default());
        let outcome = run(&orchestrator, &plan(vec![SectionSpec::new("warmup", 0, &[])]), CefrLevel::A2).await;

        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.accepted[0].attempts_used, 1);
        assert_eq!(generator.calls_for("warmup"), 2);
        assert_eq!(orchestrator.errors.retry_manager().attempts("sess-test:warmup"), 0);
    }

    #[tokio::test]
    async fn non_retryable_failure_rejects_immediately() {
        let generator = Arc::new(Scripted::new(
            "warmup",
            vec![Err(LessonError::AuthenticationFailed("user not signed in".to_string()))],
        ));
        let orchestrator = orchestrator(generator.clone(), GenerationConfig::default());
        let outcome = run(&orchestrator, &plan(vec![SectionSpec::new("warmup", 0, &[])]), CefrLevel::A2).await;

        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.failures[0].error.error_type, ErrorType::PermissionDenied);
        assert_eq!(generator.calls_for("warmup"), 1);
    }

    #[tokio::test]
    async fn cancelled_session_starts_nothing() {
        let generator = Arc::new(Scripted::new("warmup", vec![]));
        let orchestrator = orchestrator(generator.clone(), GenerationConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = orchestrator
            .run(
                &plan(vec![SectionSpec::new("warmup", 0, &[])]),
                &SharedContext::for_tests(CefrLevel::A1),
                "sess-test",
                &ProgressReporter::silent(),
                ProgressBand::new(20, 90),
                &cancel,
            )
            .await;
        assert!(outcome.cancelled);
        assert!(outcome.accepted.is_empty());
        assert!(generator.prompts.lock().is_empty());
    }

    /// Never answers.
    struct Silent {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for Silent {
        async fn generate(&self, _prompt: &str) -> Result<String, LessonError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            futures::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn call_timeout_is_a_network_error_and_retried() {
        let generator = Arc::new(Silent {
            calls: AtomicUsize::new(0),
        });
        let config = GenerationConfig {
            call_timeout_ms: 1_000,
            max_retry_attempts: Some(1),
            retry_base_delay_ms: 10,
            ..GenerationConfig::default()
        };
        let orchestrator = orchestrator(generator.clone(), config);
        let outcome = run(&orchestrator, &plan(vec![SectionSpec::new("warmup", 0, &[])]), CefrLevel::B1).await;

        assert!(outcome.accepted.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].error.error_type, ErrorType::NetworkError);
        assert!(outcome.failures[0].error.message().contains("timed out"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    /// Answers each section after a short delay and tracks how many calls overlap.
    #[derive(Default)]
    struct Overlapping {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for Overlapping {
        async fn generate(&self, prompt: &str) -> Result<String, LessonError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if prompt.contains("Section: vocabulary\n") {
                Ok(vocabulary(4))
            } else if prompt.contains("Section: discussion\n") {
                Ok(json!([
                    "Discussion",
                    "Why do people enjoy travelling by ferry?",
                    "What would you miss if you lived on an island?",
                    "How has tourism changed small villages?",
                    "Is a slow journey better than a fast one?",
                    "Where would you go for a quiet holiday?"
                ])
                .to_string())
            } else {
                Ok(warmup())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn independent_sections_overlap_up_to_the_limit() {
        let generator = Arc::new(Overlapping::default());
        let config = GenerationConfig {
            max_concurrent_sections: 2,
            ..GenerationConfig::default()
        };
        let orchestrator = orchestrator(generator.clone(), config);
        let plan = plan(vec![
            SectionSpec::new("warmup", 0, &[]),
            SectionSpec::new("vocabulary", 1, &[]),
            SectionSpec::new("discussion", 2, &[]),
        ]);

        let outcome = run(&orchestrator, &plan, CefrLevel::B1).await;
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.accepted.len(), 3);
        assert_eq!(generator.peak.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.metrics.total_sections, 3);
        assert_eq!(outcome.metrics.failed_sections, 0);
    }

    #[tokio::test]
    async fn section_with_dependency_outside_plan_is_reported() {
        let generator = Arc::new(Scripted::new("warmup", vec![]));
        let orchestrator = orchestrator(generator.clone(), GenerationConfig::default());
        let plan = plan(vec![
            SectionSpec::new("warmup", 0, &[]),
            SectionSpec::new("dialogue", 1, &["ghost"]),
        ]);

        let outcome = run(&orchestrator, &plan, CefrLevel::B1).await;
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        let dialogue = &outcome.failures[0];
        assert_eq!(dialogue.section, "dialogue");
        assert!(dialogue.error.message().contains("dependencies not accepted"));
        assert!(!dialogue.error.recoverable);
        assert_eq!(generator.calls_for("dialogue"), 0);
        assert_eq!(outcome.metrics.failed_sections, 1);
    }
}
