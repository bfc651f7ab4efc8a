//! Anthropic Messages API provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::client::{ProviderError, TextProvider, Throttle};
use super::config::ProviderConfig;
use super::types::{CompletionRequest, CompletionResponse, TokenUsage};

/// Anthropic requires an explicit output bound on every request.
const DEFAULT_MAX_TOKENS: u32 = 1500;

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    url: String,
    client: reqwest::Client,
    throttle: Throttle,
}

impl AnthropicProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            url: config.base_url.clone(),
            client: reqwest::Client::new(),
            throttle: Throttle::new(Duration::from_millis(config.rate_limit_ms)),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiErrorBody,
}

#[async_trait]
impl TextProvider for AnthropicProvider {
    async fn complete(
        &self,
        request_name: &str,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.throttle.wait().await;

        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let body = MessagesRequest {
            model: model.clone(),
            max_tokens: request.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: request.system,
            messages: vec![Message {
                role: "user",
                content: request.user,
            }],
            temperature: request.temperature,
        };

        tracing::debug!(request_name, model = %model, "Calling Anthropic");

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ProviderError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        if status != 200 {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(ProviderError::ApiError { status, message });
        }

        // An unreadable envelope is a transport problem, not a content problem.
        let parsed: MessagesResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::RequestFailed(format!("Unreadable response: {}", e)))?;

        let content = parsed
            .content
            .into_iter()
            .find_map(|c| (c.content_type == "text").then_some(c.text).flatten())
            .unwrap_or_default();

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        Ok(CompletionResponse { content, usage })
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
