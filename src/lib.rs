//! Lessonforge: validated multi-section language lesson generation.
//!
//! Source text is screened by a content gate, condensed into a shared context,
//! then expanded section by section through a text generation provider. Every
//! section is validated and regenerated with feedback until it passes or its
//! attempts run out. Failures are classified into user-facing messages with
//! recovery options, and progress is reported to an optional sink or an SSE stream.

pub mod api;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod generation;
pub mod logging;
pub mod progress;
pub mod provider;
pub mod recovery;
pub mod text;
pub mod types;
pub mod validation;
