//! CLI output: error mapping and progress display.

use crate::api::GenerationFailure;
use crate::error::LessonError;
use crate::progress::{ProgressSink, ProgressUpdate};
use tracing::info;

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &LessonError) -> String {
    match e {
        // Already a rendered failure report.
        LessonError::GenerationFailed(report) if report.trim_start().starts_with('{') => report.clone(),
        other => other.to_string(),
    }
}

/// JSON report for a failed generation: user message, recovery options, progress state.
pub fn failure_json(failure: &GenerationFailure) -> Result<String, LessonError> {
    let report = serde_json::json!({
        "error": {
            "type": failure.error.error_type,
            "errorId": failure.error.error_id,
            "message": failure.error.message(),
        },
        "user_message": failure.user_message,
        "recovery_options": failure.recovery_options,
        "progressState": failure.progress_state,
    });
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Logs each progress update.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_progress(&self, update: &ProgressUpdate) -> Result<(), LessonError> {
        info!(
            progress = update.progress,
            phase = %update.phase,
            section = update.section.as_deref().unwrap_or("-"),
            "{}",
            update.step
        );
        Ok(())
    }
}
