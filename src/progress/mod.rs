//! Progress reporting and the streaming protocol.

pub mod event;
pub mod session;
pub mod sink;
pub mod stream;

pub use event::{ProgressUpdate, StreamErrorBody, StreamEvent};
pub use session::{new_session_id, now_millis};
pub use sink::{ChannelSink, ProgressBand, ProgressReporter, ProgressSink};
pub use stream::stream_generation;

/// Coarse stage names reported in `ProgressUpdate::phase`.
pub mod phases {
    pub const INITIALIZATION: &str = "initialization";
    pub const VALIDATION: &str = "validation";
    pub const AUTHENTICATION: &str = "authentication";
    pub const CONTEXT: &str = "context";
    pub const SAVING: &str = "saving";
    pub const COMPLETE: &str = "complete";
}
