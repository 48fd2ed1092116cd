//! Integration tests for the lesson generation pipeline

mod config_loading;
mod error_recovery;
mod lesson_generation;
mod progress_stream;
mod test_utils;
