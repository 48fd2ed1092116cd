//! Progress events and their server-sent-events wire format.

use crate::api::LessonResult;
use crate::recovery::ClassifiedError;
use serde::{Deserialize, Serialize};

/// One progress report. `section` is only set inside composite sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub step: String,
    /// 0-100, non-decreasing within a session.
    pub progress: u8,
    pub phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamErrorBody {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    #[serde(rename = "errorId")]
    pub error_id: String,
}

impl From<&ClassifiedError> for StreamErrorBody {
    fn from(error: &ClassifiedError) -> Self {
        Self {
            error_type: error.error_type.as_str().to_string(),
            message: error.message().to_string(),
            error_id: error.error_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Progress(ProgressUpdate),
    Complete {
        step: String,
        progress: u8,
        lesson: Box<LessonResult>,
    },
    Error {
        error: StreamErrorBody,
        #[serde(rename = "progressState")]
        progress_state: Option<ProgressUpdate>,
    },
}

impl StreamEvent {
    pub fn complete(lesson: LessonResult) -> Self {
        StreamEvent::Complete {
            step: "Lesson ready".to_string(),
            progress: 100,
            lesson: Box::new(lesson),
        }
    }

    pub fn error(error: &ClassifiedError, progress_state: Option<ProgressUpdate>) -> Self {
        StreamEvent::Error {
            error: error.into(),
            progress_state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Progress(_))
    }

    /// `data: <json>\n\n`
    pub fn encode_sse(&self) -> Result<String, serde_json::Error> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}
