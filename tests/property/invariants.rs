//! Invariants that must hold for any input: level tables, classification,
//! progress ordering and retry backoff.

use lessonforge::context::SharedContext;
use lessonforge::progress::{ProgressBand, ProgressReporter};
use lessonforge::recovery::{classify, ErrorContext, ErrorSource, RetryManager};
use lessonforge::types::CefrLevel;
use lessonforge::validation::{SectionContent, ValidatorRegistry};
use proptest::prelude::*;
use serde_json::json;

const SOURCE: &str = "The ferry left the harbour at dawn and the journey took three hours.";

fn any_level() -> impl Strategy<Value = CefrLevel> {
    proptest::sample::select(CefrLevel::ALL.to_vec())
}

fn vocabulary_with(examples: usize) -> SectionContent {
    let entries = ["harbour", "ferry"]
        .iter()
        .map(|word| {
            json!({
                "word": word,
                "definition": "a short definition",
                "examples": (0..examples).map(|i| format!("Sentence {} about the {}.", i, word)).collect::<Vec<_>>(),
            })
        })
        .collect();
    SectionContent::new("Vocabulary", entries)
}

proptest! {
    /// A vocabulary section is valid exactly when every word has the level's example count.
    #[test]
    fn vocabulary_example_count_matches_level(level in any_level(), examples in 0usize..8) {
        let registry = ValidatorRegistry::with_defaults(60);
        let context = SharedContext::from_source(SOURCE, level, "english");
        let result = registry
            .validate("vocabulary", &vocabulary_with(examples), level, &context)
            .unwrap();
        prop_assert_eq!(result.is_valid, examples == level.vocabulary_examples());
    }

    /// Same failure, same type; every classification gets its own id.
    #[test]
    fn classification_is_deterministic(name in "[A-Za-z]{1,12}", message in ".{0,80}") {
        let source = ErrorSource { name, message, stack: None };
        let first = classify(source.clone(), ErrorContext::default());
        let second = classify(source, ErrorContext::default());
        prop_assert_eq!(first.error_type, second.error_type);
        prop_assert_eq!(first.recoverable, second.recoverable);
        prop_assert_ne!(first.error_id, second.error_id);
    }

    /// Reported progress never decreases and never exceeds 100, whatever callers send.
    #[test]
    fn reported_progress_is_monotonic(values in proptest::collection::vec(any::<u8>(), 1..40)) {
        let reporter = ProgressReporter::silent();
        let mut seen = Vec::with_capacity(values.len());
        for value in &values {
            reporter.report("step", *value, "context", None);
            seen.push(reporter.last().unwrap().progress);
        }
        prop_assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(seen.iter().all(|p| *p <= 100));
        prop_assert_eq!(reporter.current(), *seen.last().unwrap());
    }

    /// Band positions stay inside the band and grow with completed steps.
    #[test]
    fn band_positions_stay_in_band(start in 0u8..50, width in 0u8..50, total in 1usize..20) {
        let band = ProgressBand::new(start, start + width);
        let positions: Vec<u8> = (0..=total).map(|done| band.at(done, total)).collect();
        prop_assert_eq!(positions[0], band.start);
        prop_assert_eq!(*positions.last().unwrap(), band.end);
        prop_assert!(positions.windows(2).all(|w| w[0] <= w[1]));
    }

    /// Unparseable responses never panic and never produce a valid section.
    #[test]
    fn garbage_responses_are_structural_errors(raw in "[^\\[\\]{}]{0,60}") {
        let registry = ValidatorRegistry::with_defaults(60);
        let context = SharedContext::from_source(SOURCE, CefrLevel::B1, "english");
        let (_, result) = registry.validate_raw("warmup", &raw, CefrLevel::B1, &context).unwrap();
        prop_assert!(!result.is_valid);
    }
}

/// Backoff doubles with each recorded attempt and resets on clear.
#[test]
fn test_retry_delay_doubles_per_attempt() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(1u64..5_000, 0u32..10), |(base, attempts)| {
            let retry = RetryManager::new(base, None, true);
            for _ in 0..attempts {
                retry.record_retry_attempt("key");
            }
            assert_eq!(retry.retry_delay("key").as_millis() as u64, base << attempts);
            assert_eq!(retry.retry_delay("other").as_millis() as u64, base);

            retry.clear_retry_attempts("key");
            assert_eq!(retry.retry_delay("key").as_millis() as u64, base);
            Ok(())
        })
        .unwrap();
}

/// Example counts and paragraph counts follow the level tables.
#[test]
fn test_level_tables_are_ordered() {
    let examples: Vec<usize> = CefrLevel::ALL.iter().map(|l| l.vocabulary_examples()).collect();
    assert_eq!(examples, [5, 5, 4, 3, 2]);
    assert!(examples.windows(2).all(|w| w[0] >= w[1]));

    let paragraphs: Vec<usize> = CefrLevel::ALL.iter().map(|l| l.reading_paragraphs()).collect();
    assert_eq!(paragraphs, [3, 3, 4, 4, 5]);
}
