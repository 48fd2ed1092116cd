//! Provider profile: which service to call, with which model and credentials.

use crate::error::LessonError;
use crate::provider::{CompletionOptions, ModelProvider};
use serde::{Deserialize, Serialize};

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAI,
    Anthropic,
    Ollama,
    #[serde(rename = "local")]
    LocalCustom,
}

impl ProviderType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Ollama => "ollama",
            ProviderType::LocalCustom => "local",
        }
    }

    fn api_key_env(self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some(OPENAI_API_KEY_ENV),
            ProviderType::Anthropic => Some(ANTHROPIC_API_KEY_ENV),
            ProviderType::Ollama | ProviderType::LocalCustom => None,
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = LessonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" => Ok(ProviderType::Anthropic),
            "ollama" => Ok(ProviderType::Ollama),
            "local" | "custom" => Ok(ProviderType::LocalCustom),
            other => Err(LessonError::ConfigError(format!(
                "Unknown provider type: {} (expected openai, anthropic, ollama or local)",
                other
            ))),
        }
    }
}

fn default_provider_type() -> ProviderType {
    ProviderType::OpenAI
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_type")]
    pub provider_type: ProviderType,

    #[serde(default = "default_model")]
    pub model: String,

    /// Falls back to OPENAI_API_KEY / ANTHROPIC_API_KEY when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Base URL override. Required for `local`.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub default_options: CompletionOptions,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            model: default_model(),
            api_key: None,
            endpoint: None,
            default_options: CompletionOptions::default(),
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model cannot be empty".to_string());
        }
        if let Some(endpoint) = &self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(format!("Endpoint must be an http(s) URL: {}", endpoint));
            }
        }
        if self.provider_type == ProviderType::LocalCustom && self.endpoint.is_none() {
            return Err("Local provider requires an endpoint".to_string());
        }
        if let Some(temperature) = self.default_options.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!("Temperature must be within 0.0-2.0, got {}", temperature));
            }
        }
        Ok(())
    }

    /// Configured key, else the provider's environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                self.provider_type
                    .api_key_env()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|k| !k.trim().is_empty())
            })
    }

    pub fn to_model_provider(&self) -> Result<ModelProvider, LessonError> {
        let require_key = |var: &str| {
            self.resolve_api_key().ok_or_else(|| {
                LessonError::ProviderNotConfigured(format!(
                    "{} requires an API key (set provider.api_key or {})",
                    self.provider_type.as_str(),
                    var
                ))
            })
        };
        match self.provider_type {
            ProviderType::OpenAI => Ok(ModelProvider::OpenAI {
                model: self.model.clone(),
                api_key: require_key(OPENAI_API_KEY_ENV)?,
                base_url: self.endpoint.clone(),
            }),
            ProviderType::Anthropic => Ok(ModelProvider::Anthropic {
                model: self.model.clone(),
                api_key: require_key(ANTHROPIC_API_KEY_ENV)?,
            }),
            ProviderType::Ollama => Ok(ModelProvider::Ollama {
                model: self.model.clone(),
                base_url: self.endpoint.clone(),
            }),
            ProviderType::LocalCustom => Ok(ModelProvider::LocalCustom {
                model: self.model.clone(),
                endpoint: self.endpoint.clone().ok_or_else(|| {
                    LessonError::ProviderNotConfigured(
                        "Local provider requires an endpoint".to_string(),
                    )
                })?,
                api_key: self.api_key.clone(),
            }),
        }
    }
}
