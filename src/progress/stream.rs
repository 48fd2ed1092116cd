//! Server-sent-events stream over one generation session.

use super::event::StreamEvent;
use super::sink::{ChannelSink, ProgressSink};
use crate::api::{GenerateRequest, LessonApi};
use crate::error::LessonError;
use crate::recovery::{classify, ErrorContext, ErrorSource};
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Run a session in the background and expose it as SSE frames (`data: <json>\n\n`).
///
/// The stream yields every progress event followed by exactly one `complete` or
/// `error` event, then ends. Must be called from within a tokio runtime.
pub fn stream_generation(
    api: Arc<LessonApi>,
    request: GenerateRequest,
    cancel: CancellationToken,
) -> impl Stream<Item = String> + Send + 'static {
    let (tx, rx) = mpsc::unbounded_channel::<StreamEvent>();
    let progress_tx = tx.clone();

    tokio::spawn(async move {
        let sink: Arc<dyn ProgressSink> = Arc::new(ChannelSink::new(progress_tx, StreamEvent::Progress));
        let terminal = match api.generate(request, Some(sink), cancel).await {
            Ok(result) => StreamEvent::complete(result),
            Err(failure) => StreamEvent::error(&failure.error, failure.progress_state.clone()),
        };
        if tx.send(terminal).is_err() {
            warn!("stream receiver dropped before the final event");
        }
    });

    stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((event, rx))
    })
    .filter_map(|event| async move { encode(&event) })
}

/// Unencodable progress frames are dropped; an unencodable terminal frame becomes an error frame.
fn encode(event: &StreamEvent) -> Option<String> {
    match event.encode_sse() {
        Ok(frame) => Some(frame),
        Err(err) if !event.is_terminal() => {
            warn!(error = %err, "dropping unencodable progress event");
            None
        }
        Err(err) => {
            warn!(error = %err, "failed to encode final stream event");
            let classified = classify(
                ErrorSource::from(&LessonError::from(err)),
                ErrorContext::default(),
            );
            let fallback = StreamEvent::error(&classified, None);
            Some(
                fallback
                    .encode_sse()
                    .unwrap_or_else(|_| "data: {\"type\":\"error\"}\n\n".to_string()),
            )
        }
    }
}
