//! Integration tests for layered configuration loading

use super::test_utils::with_isolated_config_home;
use lessonforge::cli::RunContext;
use lessonforge::config::{ConfigLoader, ExhaustedPolicy, ProviderType};
use lessonforge::error::LessonError;
use std::fs;
use tempfile::TempDir;

fn write_workspace_config(workspace: &std::path::Path, name: &str, body: &str) {
    let dir = workspace.join("config");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), body).unwrap();
}

#[test]
fn test_workspace_file_overrides_defaults() {
    let temp = TempDir::new().unwrap();
    write_workspace_config(
        temp.path(),
        "config.toml",
        r#"
[generation]
min_word_count = 80
strict_mode = true
exhausted_policy = "reject"

[provider]
provider_type = "ollama"
model = "llama3"
"#,
    );

    let config = with_isolated_config_home(&temp, || ConfigLoader::load(temp.path())).unwrap();
    assert_eq!(config.generation.min_word_count, 80);
    assert!(config.generation.strict_mode);
    assert_eq!(config.generation.exhausted_policy, ExhaustedPolicy::Reject);
    assert_eq!(config.generation.max_section_attempts, 2);
    assert_eq!(config.provider.provider_type, ProviderType::Ollama);
    assert_eq!(config.provider.model, "llama3");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_global_file_is_overridden_by_workspace() {
    let temp = TempDir::new().unwrap();
    let global_dir = temp.path().join("xdg").join("lessonforge");
    fs::create_dir_all(&global_dir).unwrap();
    fs::write(
        global_dir.join("config.toml"),
        "[generation]\nmin_word_count = 70\nmax_concurrent_sections = 1\n",
    )
    .unwrap();
    let workspace = temp.path().join("ws");
    write_workspace_config(&workspace, "config.toml", "[generation]\nmin_word_count = 90\n");

    let config = with_isolated_config_home(&temp, || ConfigLoader::load(&workspace)).unwrap();
    assert_eq!(config.generation.min_word_count, 90);
    assert_eq!(config.generation.max_concurrent_sections, 1);
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let result = ConfigLoader::load_from_file(&temp.path().join("absent.toml"));
    assert!(matches!(result, Err(LessonError::ConfigError(_))));
}

#[test]
fn test_run_context_rejects_invalid_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.toml");
    fs::write(&path, "[generation]\nmax_concurrent_sections = 0\n[logging]\nformat = \"xml\"\n").unwrap();

    match RunContext::new(temp.path().to_path_buf(), Some(path)) {
        Err(LessonError::ConfigError(message)) => {
            assert!(message.contains("Generation:"));
            assert!(message.contains("Logging:"));
        }
        other => panic!("expected config error, got {:?}", other.err()),
    }
}
