//! Property-based tests for pipeline invariants

mod invariants;
