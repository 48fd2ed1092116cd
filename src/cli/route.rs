//! CLI route: run context and dispatch to the library services.

use crate::api::{GenerateRequest, LessonApi};
use crate::cli::output::{failure_json, LogSink};
use crate::cli::parse::Commands;
use crate::config::{ConfigLoader, LessonforgeConfig, ProviderConfig, ProviderType};
use crate::error::LessonError;
use crate::gate::ContentGate;
use crate::progress::{stream_generation, ProgressSink};
use crate::provider::ProviderFactory;
use crate::recovery::{ErrorContext, ErrorHandler, ErrorSource};
use crate::text::word_count;
use futures::StreamExt;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runtime context for CLI execution: the loaded configuration.
pub struct RunContext {
    config: LessonforgeConfig,
}

impl RunContext {
    /// Load configuration from an explicit file or the workspace, then validate it.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, LessonError> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(&path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Self::from_config(config)
    }

    pub fn from_config(config: LessonforgeConfig) -> Result<Self, LessonError> {
        if let Err(errors) = config.validate() {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(LessonError::ConfigError(joined));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &LessonforgeConfig {
        &self.config
    }

    /// Execute a command; the returned string is printed by the binary.
    pub async fn execute(&self, command: &Commands) -> Result<String, LessonError> {
        match command {
            Commands::Generate {
                input,
                level,
                lesson_type,
                language,
                stream,
                provider,
                model,
                endpoint,
            } => {
                let provider = provider_overrides(
                    &self.config.provider,
                    *provider,
                    model.as_deref(),
                    endpoint.as_deref(),
                );
                let request = GenerateRequest {
                    content: read_input(input)?,
                    level: *level,
                    lesson_type: lesson_type.clone(),
                    target_language: language.clone(),
                    metadata: [("source_file".to_string(), json!(input.display().to_string()))]
                        .into_iter()
                        .collect(),
                };
                self.generate(&provider, request, *stream).await
            }
            Commands::Check { input, language } => {
                let content = read_input(input)?;
                self.check(&content, language.as_deref())
            }
            Commands::Classify { message, name } => self.classify(message, name.as_deref()),
        }
    }

    async fn generate(
        &self,
        provider: &ProviderConfig,
        request: GenerateRequest,
        stream: bool,
    ) -> Result<String, LessonError> {
        let generator = ProviderFactory::create_generator(provider)?;
        let api = Arc::new(LessonApi::new(self.config.generation.clone(), generator));
        let cancel = cancel_on_ctrl_c();
        info!(
            provider = provider.provider_type.as_str(),
            model = %provider.model,
            level = %request.level,
            "generating lesson"
        );

        if stream {
            let mut frames = Box::pin(stream_generation(api, request, cancel));
            let mut stdout = std::io::stdout();
            while let Some(frame) = frames.next().await {
                stdout
                    .write_all(frame.as_bytes())
                    .and_then(|_| stdout.flush())
                    .map_err(|e| LessonError::GenerationFailed(format!("Failed to write stream: {}", e)))?;
            }
            return Ok(String::new());
        }

        let sink: Arc<dyn ProgressSink> = Arc::new(LogSink);
        match api.generate(request, Some(sink), cancel).await {
            Ok(result) => Ok(serde_json::to_string_pretty(&result)?),
            Err(failure) => Err(LessonError::GenerationFailed(failure_json(&failure)?)),
        }
    }

    fn check(&self, content: &str, language: Option<&str>) -> Result<String, LessonError> {
        let gate = ContentGate::new(&self.config.generation);
        let validation = gate.validate_for_language(content, language);
        let quality = gate.check_content_quality(content);
        let report = json!({
            "word_count": word_count(content),
            "validation": validation,
            "quality": quality,
            "suitable_for_extraction": gate.is_suitable_for_extraction(content),
        });
        Ok(serde_json::to_string_pretty(&report)?)
    }

    fn classify(&self, message: &str, name: Option<&str>) -> Result<String, LessonError> {
        let handler = ErrorHandler::new(&self.config.generation);
        let mut source = ErrorSource::from_message(message);
        if let Some(name) = name {
            source.name = name.to_string();
        }
        let classified = handler.classify(source, ErrorContext::default());
        let key = "cli";
        let report = json!({
            "classified": classified,
            "can_retry": handler.can_retry(&classified, key),
            "user_message": handler.user_message(&classified),
            "support_message": handler.support_message(&classified),
            "recovery_options": handler.recovery_options(&classified, key),
        });
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

/// CLI flags replace the configured provider; switching provider type drops a stale endpoint.
fn provider_overrides(
    base: &ProviderConfig,
    provider_type: Option<ProviderType>,
    model: Option<&str>,
    endpoint: Option<&str>,
) -> ProviderConfig {
    let mut config = base.clone();
    if let Some(provider_type) = provider_type {
        if provider_type != config.provider_type {
            config.endpoint = None;
        }
        config.provider_type = provider_type;
    }
    if let Some(model) = model {
        config.model = model.to_string();
    }
    if let Some(endpoint) = endpoint {
        config.endpoint = Some(endpoint.to_string());
    }
    config
}

fn read_input(path: &Path) -> Result<String, LessonError> {
    std::fs::read_to_string(path).map_err(|e| {
        LessonError::InvalidContent(format!("Cannot read input file {}: {}", path.display(), e))
    })
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupt received, cancelling generation");
                token.cancel();
            }
            Err(err) => warn!(error = %err, "cannot listen for interrupts"),
        }
    });
    cancel
}
