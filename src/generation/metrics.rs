//! Per-session quality metrics.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Aggregates for one generation session. Only the orchestrator mutates them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Accepted sections.
    pub total_sections: usize,
    pub total_regenerations: usize,
    /// Mean quality score of accepted sections, in [0, 1].
    pub average_quality_score: f64,
    #[serde(with = "duration_ms")]
    pub total_generation_time: Duration,
    pub failed_sections: usize,
    /// Sections accepted after exhausting their attempts.
    pub accepted_best_effort: usize,
}

impl QualityMetrics {
    pub fn record_accepted(&mut self, quality_score: f64, best_effort: bool) {
        let previous_total = self.average_quality_score * self.total_sections as f64;
        self.total_sections += 1;
        self.average_quality_score = (previous_total + quality_score) / self.total_sections as f64;
        if best_effort {
            self.accepted_best_effort += 1;
        }
    }

    pub fn record_regeneration(&mut self) {
        self.total_regenerations += 1;
    }

    pub fn record_failed(&mut self) {
        self.failed_sections += 1;
    }

    pub fn add_generation_time(&mut self, elapsed: Duration) {
        self.total_generation_time += elapsed;
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
