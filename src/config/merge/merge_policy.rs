//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Only the keys other layers commonly override are seeded here; every other field
/// falls back to its serde default.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("generation.min_word_count", 50)?
        .set_default("generation.min_quality_score", 60)?
        .set_default("generation.max_section_attempts", 2)?
        .set_default("provider.provider_type", "openai")?
        .set_default("logging.level", "info")
}
