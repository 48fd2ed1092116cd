//! Best-effort delivery of progress updates to a caller-supplied sink.

use super::event::ProgressUpdate;
use crate::error::LessonError;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Receives progress updates. Failures (including panics) are logged and ignored.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, update: &ProgressUpdate) -> Result<(), LessonError>;
}

/// Forwards updates into a tokio channel.
pub struct ChannelSink<T> {
    sender: tokio::sync::mpsc::UnboundedSender<T>,
    wrap: fn(ProgressUpdate) -> T,
}

impl<T: Send> ChannelSink<T> {
    pub fn new(sender: tokio::sync::mpsc::UnboundedSender<T>, wrap: fn(ProgressUpdate) -> T) -> Self {
        Self { sender, wrap }
    }
}

impl<T: Send> ProgressSink for ChannelSink<T> {
    fn on_progress(&self, update: &ProgressUpdate) -> Result<(), LessonError> {
        self.sender
            .send((self.wrap)(update.clone()))
            .map_err(|_| LessonError::GenerationFailed("progress receiver closed".to_string()))
    }
}

#[derive(Debug, Default)]
struct ReporterState {
    high_water: u8,
    last: Option<ProgressUpdate>,
}

/// Enforces monotonic progress and isolates the session from sink failures.
pub struct ProgressReporter {
    sink: Option<Arc<dyn ProgressSink>>,
    state: Mutex<ReporterState>,
}

impl ProgressReporter {
    pub fn new(sink: Option<Arc<dyn ProgressSink>>) -> Self {
        Self {
            sink,
            state: Mutex::new(ReporterState::default()),
        }
    }

    pub fn silent() -> Self {
        Self::new(None)
    }

    /// Values above 100 are clamped; values below an earlier report are raised to it.
    pub fn report(&self, step: impl Into<String>, progress: u8, phase: &str, section: Option<&str>) {
        let mut state = self.state.lock();
        let progress = progress.min(100).max(state.high_water);
        state.high_water = progress;
        let update = ProgressUpdate {
            step: step.into(),
            progress,
            phase: phase.to_string(),
            section: section.map(str::to_string),
        };
        state.last = Some(update.clone());

        // Delivered under the lock so concurrent sections cannot reorder updates.
        if let Some(sink) = &self.sink {
            match catch_unwind(AssertUnwindSafe(|| sink.on_progress(&update))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(phase, progress, error = %err, "progress sink failed");
                }
                Err(_) => {
                    warn!(phase, progress, "progress sink panicked");
                }
            }
        }
    }

    /// Last update produced in this session.
    pub fn last(&self) -> Option<ProgressUpdate> {
        self.state.lock().last.clone()
    }

    pub fn current(&self) -> u8 {
        self.state.lock().high_water
    }
}

/// A progress range owned by one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressBand {
    pub start: u8,
    pub end: u8,
}

impl ProgressBand {
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    /// Position after `done` of `total` equal steps.
    pub fn at(&self, done: usize, total: usize) -> u8 {
        self.at_fraction(done as f64, total)
    }

    /// Position for a fractional step count, e.g. part way through one section.
    pub fn at_fraction(&self, done: f64, total: usize) -> u8 {
        if total == 0 {
            return self.end;
        }
        let span = f64::from(self.end.saturating_sub(self.start));
        let ratio = (done / total as f64).clamp(0.0, 1.0);
        self.start + (span * ratio).floor() as u8
    }
}
