//! Server-sent-event stream over a generation session

use super::test_utils::*;
use futures::StreamExt;
use lessonforge::api::{GenerateRequest, LessonApi};
use lessonforge::progress::stream_generation;
use lessonforge::types::CefrLevel;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

async fn collect_events(api: LessonApi, request: GenerateRequest) -> Vec<Value> {
    let frames: Vec<String> = stream_generation(Arc::new(api), request, CancellationToken::new())
        .collect()
        .await;
    frames
        .iter()
        .map(|frame| {
            assert!(frame.starts_with("data: "), "bad frame prefix: {:?}", frame);
            assert!(frame.ends_with("\n\n"), "bad frame terminator: {:?}", frame);
            serde_json::from_str(frame["data: ".len()..].trim_end()).unwrap()
        })
        .collect()
}

fn terminal_count(events: &[Value]) -> usize {
    events.iter().filter(|e| e["type"] != "progress").count()
}

#[tokio::test]
async fn test_stream_ends_with_single_complete_event() {
    let api = LessonApi::new(fast_config(), Arc::new(LessonScript::new(CefrLevel::B1)));
    let events = collect_events(api, GenerateRequest::new(SAMPLE_TEXT, CefrLevel::B1)).await;

    assert_eq!(terminal_count(&events), 1);
    let last = events.last().unwrap();
    assert_eq!(last["type"], "complete");
    assert_eq!(last["progress"], 100);
    assert_eq!(last["lesson"]["lesson"]["sections"].as_array().unwrap().len(), 5);

    let progress: Vec<u64> = events
        .iter()
        .filter(|e| e["type"] == "progress")
        .map(|e| e["progress"].as_u64().unwrap())
        .collect();
    assert!(!progress.is_empty());
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(events[0]["phase"], "initialization");
}

#[tokio::test]
async fn test_stream_reports_gate_failure_as_error_event() {
    let api = LessonApi::new(fast_config(), Arc::new(LessonScript::new(CefrLevel::B1)));
    let request = GenerateRequest::new(
        "This sentence has only eleven words in it, far too few.",
        CefrLevel::B1,
    );
    let events = collect_events(api, request).await;

    assert_eq!(terminal_count(&events), 1);
    let last = events.last().unwrap();
    assert_eq!(last["type"], "error");
    assert_eq!(last["error"]["type"], "CONTENT_ISSUE");
    assert!(last["error"]["errorId"].as_str().unwrap().starts_with("err-"));
    assert_eq!(last["progressState"]["phase"], "validation");
}
