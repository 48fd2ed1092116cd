//! Failure classification and recovery options surfaced by `LessonApi::generate`

use super::test_utils::*;
use async_trait::async_trait;
use lessonforge::api::{Authenticator, GenerateRequest, LessonApi, UserIdentity};
use lessonforge::config::GenerationConfig;
use lessonforge::error::LessonError;
use lessonforge::recovery::{ErrorType, RecoveryAction};
use lessonforge::types::CefrLevel;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const ELEVEN_WORDS: &str = "This sentence has only eleven words in it, far too few.";

struct SignedOut;

#[async_trait]
impl Authenticator for SignedOut {
    async fn authenticate(&self) -> Result<UserIdentity, LessonError> {
        Err(LessonError::AuthenticationFailed("not signed in".to_string()))
    }
}

fn primary(options: &[lessonforge::recovery::RecoveryOption]) -> RecoveryAction {
    let primaries: Vec<_> = options.iter().filter(|o| o.primary).collect();
    assert_eq!(primaries.len(), 1, "exactly one primary option expected");
    primaries[0].action
}

#[tokio::test]
async fn test_short_content_is_rejected_before_any_service_call() {
    let generator = Arc::new(FailingGenerator::new(LessonError::ProviderError("unused".to_string())));
    let api = LessonApi::new(fast_config(), generator.clone());

    let failure = api
        .generate(
            GenerateRequest::new(ELEVEN_WORDS, CefrLevel::B1),
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(generator.calls(), 0);
    assert_eq!(failure.error.error_type, ErrorType::ContentIssue);
    assert!(!failure.error.recoverable);
    assert_eq!(failure.error.context.extra["issues"][0]["type"], "insufficient_content");
    assert_eq!(failure.progress_state.as_ref().unwrap().phase, "validation");
    assert_eq!(primary(&failure.recovery_options), RecoveryAction::TryDifferentContent);
    assert!(failure
        .recovery_options
        .iter()
        .all(|o| o.action != RecoveryAction::Retry));
    assert_eq!(failure.user_message.error_id, failure.error.error_id);
    assert_eq!(failure.support.error_id, failure.error.error_id);
}

#[tokio::test]
async fn test_quota_failures_exhaust_retries_and_fail_session() {
    let generator = Arc::new(FailingGenerator::new(LessonError::ProviderRateLimit(
        "429 Too Many Requests".to_string(),
    )));
    let api = LessonApi::new(fast_config(), generator.clone());

    let failure = api
        .generate(
            GenerateRequest::new(SAMPLE_TEXT, CefrLevel::B1),
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.error.error_type, ErrorType::QuotaExceeded);
    assert_eq!(failure.error.context.section.as_deref(), Some("warmup"));
    // Retries are spent, so waiting is no longer offered.
    assert!(failure
        .recovery_options
        .iter()
        .all(|o| o.action != RecoveryAction::RetryLater));
    assert_eq!(primary(&failure.recovery_options), RecoveryAction::ManualSelection);
    // Three context calls plus one call and three retries for each root section.
    assert_eq!(generator.calls(), 3 + 4 + 4);
}

#[tokio::test]
async fn test_disabled_retry_fails_on_first_quota_error() {
    let generator = Arc::new(FailingGenerator::new(LessonError::ProviderRateLimit(
        "quota exceeded".to_string(),
    )));
    let config = GenerationConfig {
        enable_retry: false,
        ..fast_config()
    };
    let api = LessonApi::new(config, generator.clone());

    let failure = api
        .generate(
            GenerateRequest::new(SAMPLE_TEXT, CefrLevel::B1),
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.error.error_type, ErrorType::QuotaExceeded);
    assert_eq!(generator.calls(), 3 + 1 + 1);
}

#[tokio::test]
async fn test_signed_out_user_gets_permission_denied() {
    let api = LessonApi::new(fast_config(), Arc::new(LessonScript::new(CefrLevel::B1)))
        .with_authenticator(Arc::new(SignedOut));

    let failure = api
        .generate(
            GenerateRequest::new(SAMPLE_TEXT, CefrLevel::B1),
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.error.error_type, ErrorType::PermissionDenied);
    assert_eq!(failure.progress_state.unwrap().phase, "authentication");
    assert_eq!(primary(&failure.recovery_options), RecoveryAction::ManualSelection);
}

#[tokio::test]
async fn test_unsupported_language_is_a_content_issue() {
    let api = LessonApi::new(fast_config(), Arc::new(LessonScript::new(CefrLevel::B1)));
    let failure = api
        .generate(
            GenerateRequest::new(SAMPLE_TEXT, CefrLevel::B1).with_target_language("klingon"),
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(failure.error.error_type, ErrorType::ContentIssue);
    assert_eq!(failure.error.context.extra["issues"][0]["type"], "unsupported_language");
}

#[tokio::test]
async fn test_technical_details_follow_config() {
    let config = GenerationConfig {
        show_technical_details: true,
        ..fast_config()
    };
    let api = LessonApi::new(config, Arc::new(LessonScript::new(CefrLevel::B1)));
    let failure = api
        .generate(
            GenerateRequest::new(ELEVEN_WORDS, CefrLevel::B1),
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    let details = failure.user_message.technical_details.unwrap();
    assert!(details.contains("11 words"));
}
