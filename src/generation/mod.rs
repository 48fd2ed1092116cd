//! Lesson generation: section plans, prompts, the orchestrator and its metrics.

pub mod metrics;
pub mod orchestrator;
pub mod plan;
pub mod prompts;

pub use metrics::QualityMetrics;
pub use orchestrator::{OrchestrationOutcome, SectionFailure, SectionOrchestrator, SectionResult};
pub use plan::{LessonPlan, SectionSpec};
pub use prompts::RegenerationContext;
