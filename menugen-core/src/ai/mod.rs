//! Text-generation provider integration.
//!
//! This module provides:
//! - `TextProvider` trait for abstracting completion endpoints
//! - OpenRouter (OpenAI-compatible) and Anthropic implementations
//! - `FakeProvider` for tests and offline runs
//! - Configuration via environment variables
//! - Prompt templates for item content, ingredient matching and nutrition
//!
//! # Configuration
//!
//! - `MENUGEN_PROVIDER` (optional): "openrouter" (default), "anthropic" or "fake"
//! - `OPENROUTER_API_KEY` / `ANTHROPIC_API_KEY`: key for the selected provider
//! - `MENUGEN_MODEL` (optional): model name, e.g. "openai/gpt-4o-mini"
//! - `MENUGEN_BASE_URL` (optional): API base URL
//! - `MENUGEN_RATE_LIMIT_MS` (optional): delay between requests in ms

mod anthropic;
mod client;
mod config;
mod fake;
pub mod prompts;
mod types;

use std::sync::Arc;

pub use anthropic::AnthropicProvider;
pub use client::{OpenRouterProvider, ProviderError, TextProvider};
pub use config::{ConfigError, ProviderConfig, ProviderKind};
pub use fake::{FakeProvider, FAKE_USAGE};
pub use types::{CompletionRequest, CompletionResponse, TokenUsage};

/// Build the provider selected by `config`.
pub fn create_provider(config: &ProviderConfig) -> Arc<dyn TextProvider> {
    match config.kind {
        ProviderKind::OpenRouter => Arc::new(OpenRouterProvider::new(config)),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(config)),
        ProviderKind::Fake => Arc::new(FakeProvider::offline()),
    }
}

/// Build the provider selected by the environment.
pub fn create_provider_from_env() -> Result<Arc<dyn TextProvider>, ProviderError> {
    let config = ProviderConfig::from_env()?;
    tracing::debug!(kind = ?config.kind, model = %config.model, "Creating text provider");
    Ok(create_provider(&config))
}
