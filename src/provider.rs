//! Text generation providers
//!
//! The pipeline depends only on [`TextGenerator`]: a prompt goes in, text comes out, and
//! the call may fail or be slow. Concrete chat clients (OpenAI-compatible, Anthropic,
//! Ollama) implement [`ModelProviderClient`] and are adapted into a generator by
//! [`ProviderGenerator`].

use crate::error::LessonError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub mod profile;

pub use profile::{ProviderConfig, ProviderType};

/// The only capability the lesson pipeline needs from a text service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LessonError>;
}

/// Resolved provider with credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelProvider {
    OpenAI {
        model: String,
        api_key: String,
        base_url: Option<String>,
    },
    Anthropic {
        model: String,
        api_key: String,
    },
    Ollama {
        model: String,
        base_url: Option<String>,
    },
    LocalCustom {
        model: String,
        endpoint: String,
        api_key: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Chat completion client for one provider and model.
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, LessonError>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 4096;

fn build_provider_http_client() -> Result<Client, LessonError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| LessonError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

fn map_http_error(error: reqwest::Error) -> LessonError {
    if let Some(status) = error.status() {
        map_status(status, &error.to_string())
    } else if error.is_timeout() {
        LessonError::ProviderRequestFailed(format!("Request timed out: {}", error))
    } else if error.is_connect() {
        LessonError::ProviderRequestFailed(format!("Connection error: {}", error))
    } else {
        LessonError::ProviderError(format!("HTTP error: {}", error))
    }
}

fn map_status(status: StatusCode, body: &str) -> LessonError {
    match status.as_u16() {
        401 | 403 => LessonError::ProviderAuthFailed(body.to_string()),
        429 => LessonError::ProviderRateLimit(body.to_string()),
        404 => LessonError::ProviderModelNotFound(body.to_string()),
        _ => LessonError::ProviderRequestFailed(format!("status {}: {}", status, body)),
    }
}

async fn read_error_body(response: reqwest::Response) -> LessonError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    map_status(status, &body)
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(flatten)]
    options: &'a CompletionOptions,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat completions, also used for any OpenAI-compatible endpoint.
pub struct OpenAIClient {
    client: Client,
    model: String,
    api_key: Option<String>,
    base_url: String,
    name: &'static str,
}

impl OpenAIClient {
    pub fn new(model: String, api_key: String, base_url: Option<String>) -> Result<Self, LessonError> {
        Ok(Self {
            client: build_provider_http_client()?,
            model,
            api_key: Some(api_key),
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            name: "openai",
        })
    }

    /// Self-hosted OpenAI-compatible server; the key is optional.
    pub fn custom(model: String, endpoint: String, api_key: Option<String>) -> Result<Self, LessonError> {
        Ok(Self {
            client: build_provider_http_client()?,
            model,
            api_key,
            base_url: endpoint.trim_end_matches('/').to_string(),
            name: "local",
        })
    }
}

#[async_trait]
impl ModelProviderClient for OpenAIClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, LessonError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: &messages,
            options: &options,
            stream: false,
        };
        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(map_http_error)?;
        if !response.status().is_success() {
            return Err(read_error_body(response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LessonError::ProviderError(format!("Failed to parse response: {}", e)))?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LessonError::ProviderError("No choices in response".to_string()))?;

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            model: completion.model,
            usage: completion.usage.unwrap_or_default(),
            finish_reason: choice.finish_reason,
        })
    }

    fn provider_name(&self) -> &str {
        self.name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Anthropic messages API.
pub struct AnthropicClient {
    client: Client,
    model: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(model: String, api_key: String) -> Result<Self, LessonError> {
        Ok(Self {
            client: build_provider_http_client()?,
            model,
            api_key,
        })
    }
}

#[async_trait]
impl ModelProviderClient for AnthropicClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, LessonError> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect();
        let turns: Vec<&ChatMessage> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": options.max_tokens.unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS),
            "messages": turns,
        });
        if !system.is_empty() {
            body["system"] = json!(system.join("\n\n"));
        }
        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(stop) = &options.stop {
            body["stop_sequences"] = json!(stop);
        }

        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;
        if !response.status().is_success() {
            return Err(read_error_body(response).await);
        }

        #[derive(Deserialize)]
        struct AnthropicResponse {
            content: Vec<AnthropicBlock>,
            model: String,
            stop_reason: Option<String>,
            usage: Option<AnthropicUsage>,
        }
        #[derive(Deserialize)]
        struct AnthropicBlock {
            #[serde(default)]
            text: String,
        }
        #[derive(Deserialize)]
        struct AnthropicUsage {
            input_tokens: u32,
            output_tokens: u32,
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LessonError::ProviderError(format!("Failed to parse response: {}", e)))?;
        let usage = completion.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        });

        Ok(CompletionResponse {
            content: completion
                .content
                .into_iter()
                .map(|b| b.text)
                .collect::<Vec<_>>()
                .join(""),
            model: completion.model,
            usage,
            finish_reason: completion.stop_reason,
        })
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Local models through Ollama's native chat endpoint.
pub struct OllamaClient {
    client: Client,
    model: String,
    base_url: String,
}

impl OllamaClient {
    pub fn new(model: String, base_url: Option<String>) -> Result<Self, LessonError> {
        Ok(Self {
            client: build_provider_http_client()?,
            model,
            base_url: base_url.unwrap_or_else(|| "http://localhost:11434".to_string()),
        })
    }
}

#[async_trait]
impl ModelProviderClient for OllamaClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, LessonError> {
        let mut model_options = json!({});
        if let Some(temperature) = options.temperature {
            model_options["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = options.max_tokens {
            model_options["num_predict"] = json!(max_tokens);
        }
        if let Some(top_p) = options.top_p {
            model_options["top_p"] = json!(top_p);
        }
        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": model_options,
        });

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;
        if !response.status().is_success() {
            return Err(read_error_body(response).await);
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            model: String,
            message: ChoiceMessage,
            #[serde(default)]
            done_reason: Option<String>,
            #[serde(default)]
            prompt_eval_count: u32,
            #[serde(default)]
            eval_count: u32,
        }

        let completion: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LessonError::ProviderError(format!("Failed to parse response: {}", e)))?;

        Ok(CompletionResponse {
            content: completion.message.content.unwrap_or_default(),
            model: completion.model,
            usage: TokenUsage {
                prompt_tokens: completion.prompt_eval_count,
                completion_tokens: completion.eval_count,
                total_tokens: completion.prompt_eval_count + completion.eval_count,
            },
            finish_reason: completion.done_reason,
        })
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Provider factory for creating provider clients
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(
        provider: &ModelProvider,
    ) -> Result<Box<dyn ModelProviderClient>, LessonError> {
        match provider {
            ModelProvider::OpenAI {
                model,
                api_key,
                base_url,
            } => Ok(Box::new(OpenAIClient::new(
                model.clone(),
                api_key.clone(),
                base_url.clone(),
            )?)),
            ModelProvider::Anthropic { model, api_key } => Ok(Box::new(AnthropicClient::new(
                model.clone(),
                api_key.clone(),
            )?)),
            ModelProvider::Ollama { model, base_url } => Ok(Box::new(OllamaClient::new(
                model.clone(),
                base_url.clone(),
            )?)),
            ModelProvider::LocalCustom {
                model,
                endpoint,
                api_key,
            } => Ok(Box::new(OpenAIClient::custom(
                model.clone(),
                endpoint.clone(),
                api_key.clone(),
            )?)),
        }
    }

    /// Generator ready for the pipeline, built from configuration.
    pub fn create_generator(config: &ProviderConfig) -> Result<Arc<dyn TextGenerator>, LessonError> {
        config.validate().map_err(LessonError::ConfigError)?;
        let client = Self::create_client(&config.to_model_provider()?)?;
        Ok(Arc::new(ProviderGenerator::new(
            client,
            config.default_options.clone(),
        )))
    }
}

pub const LESSON_SYSTEM_PROMPT: &str = "You are an experienced language teacher who writes \
    lesson material. Follow the requested output format exactly and answer with the \
    requested JSON only, without commentary.";

/// Adapts a chat client into a [`TextGenerator`] with a fixed system prompt.
pub struct ProviderGenerator {
    client: Box<dyn ModelProviderClient>,
    system_prompt: String,
    options: CompletionOptions,
}

impl ProviderGenerator {
    pub fn new(client: Box<dyn ModelProviderClient>, options: CompletionOptions) -> Self {
        Self {
            client,
            system_prompt: LESSON_SYSTEM_PROMPT.to_string(),
            options,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }
}

#[async_trait]
impl TextGenerator for ProviderGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LessonError> {
        let messages = vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(prompt),
        ];
        let response = self.client.complete(messages, self.options.clone()).await?;
        debug!(
            provider = self.client.provider_name(),
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            finish_reason = response.finish_reason.as_deref().unwrap_or("-"),
            "completion received"
        );
        Ok(response.content)
    }
}
