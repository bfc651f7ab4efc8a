//! Text provider trait and the OpenRouter (OpenAI-compatible) implementation.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::config::{ConfigError, ProviderConfig};
use super::types::{CompletionRequest, CompletionResponse, TokenUsage};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ProviderError {
    /// Whether the same request may succeed later: transport failures, rate
    /// limits, timeouts and server-side errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::RateLimited { .. } => true,
            Self::ApiError { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::NotConfigured(_) | Self::Config(_) => false,
        }
    }
}

/// A prompt/response completion endpoint.
///
/// Implementations must be thread-safe; one provider is shared by every
/// concurrent item of a batch.
#[async_trait]
pub trait TextProvider: Send + Sync + fmt::Debug {
    /// Complete a request. `request_name` labels the call in logs.
    async fn complete(
        &self,
        request_name: &str,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Get the provider name (e.g., "openrouter", "anthropic", "fake").
    fn provider_name(&self) -> &'static str;

    /// Get the default model name.
    fn model_name(&self) -> &str;
}

/// Enforces a minimum spacing between consecutive calls.
#[derive(Debug)]
pub(crate) struct Throttle {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Throttle {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub(crate) async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Provider backed by OpenRouter's OpenAI-compatible chat API.
pub struct OpenRouterProvider {
    client: Client<OpenAIConfig>,
    model: String,
    throttle: Throttle,
}

impl fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenRouterProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            throttle: Throttle::new(Duration::from_millis(config.rate_limit_ms)),
        }
    }

    fn build_messages(
        request: &CompletionRequest,
    ) -> Result<Vec<ChatCompletionRequestMessage>, ProviderError> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(request.system.clone())
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build system message: {}", e)))?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(request.user.clone())
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build user message: {}", e)))?;

        Ok(vec![system.into(), user.into()])
    }
}

/// The client already retries rate limits and server errors internally, so
/// an API error that reaches us is a rejection of the request itself.
fn map_openai_error(err: OpenAIError) -> ProviderError {
    match err {
        OpenAIError::ApiError(api) => ProviderError::ApiError {
            status: 400,
            message: api.message,
        },
        other => ProviderError::RequestFailed(other.to_string()),
    }
}

#[async_trait]
impl TextProvider for OpenRouterProvider {
    async fn complete(
        &self,
        request_name: &str,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.throttle.wait().await;

        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let messages = Self::build_messages(&request)?;

        let mut req_builder = CreateChatCompletionRequestArgs::default();
        req_builder.model(&model).messages(messages);

        if let Some(max_tokens) = request.max_output_tokens {
            req_builder.max_completion_tokens(max_tokens);
        }

        if let Some(temperature) = request.temperature {
            req_builder.temperature(temperature);
        }

        if request.json_response {
            req_builder.response_format(ResponseFormat::JsonObject);
        }

        let openai_request = req_builder
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        tracing::debug!(request_name, model = %model, "Calling OpenRouter");

        let response = self
            .client
            .chat()
            .create(openai_request)
            .await
            .map_err(map_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse { content, usage })
    }

    fn provider_name(&self) -> &'static str {
        "openrouter"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
