//! Provider configuration from environment variables.

use std::env;
use thiserror::Error;

/// Default OpenRouter base URL.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default Anthropic Messages API URL.
pub const DEFAULT_ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

/// Default model to use.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Default Anthropic model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Which text-generation backend to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenRouter,
    Anthropic,
    Fake,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openrouter" | "openai" => Ok(Self::OpenRouter),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "fake" => Ok(Self::Fake),
            other => Err(ConfigError::InvalidValue {
                name: "MENUGEN_PROVIDER".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Provider connection settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// API key for the selected provider. Not needed for the fake provider.
    pub api_key: String,
    /// Model name (e.g., "openai/gpt-4o-mini", "claude-3-5-haiku-latest").
    pub model: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Minimum milliseconds between two provider calls.
    pub rate_limit_ms: u64,
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    ///
    /// - `MENUGEN_PROVIDER`: "openrouter" (default), "anthropic" or "fake"
    /// - `OPENROUTER_API_KEY` / `ANTHROPIC_API_KEY`: required for the matching provider
    /// - `MENUGEN_MODEL`: model name (provider-specific default)
    /// - `MENUGEN_BASE_URL`: API base URL (provider-specific default)
    /// - `MENUGEN_RATE_LIMIT_MS`: spacing between calls (default: 0)
    pub fn from_env() -> Result<Self, ConfigError> {
        let kind = match env::var("MENUGEN_PROVIDER") {
            Ok(value) => ProviderKind::parse(&value)?,
            Err(_) => ProviderKind::OpenRouter,
        };

        let (key_var, default_model, default_url) = match kind {
            ProviderKind::OpenRouter => ("OPENROUTER_API_KEY", DEFAULT_MODEL, DEFAULT_BASE_URL),
            ProviderKind::Anthropic => (
                "ANTHROPIC_API_KEY",
                DEFAULT_ANTHROPIC_MODEL,
                DEFAULT_ANTHROPIC_URL,
            ),
            ProviderKind::Fake => ("", "fake-model", ""),
        };

        let api_key = if kind == ProviderKind::Fake {
            String::new()
        } else {
            env::var(key_var).map_err(|_| ConfigError::MissingEnvVar(key_var.to_string()))?
        };

        let model = env::var("MENUGEN_MODEL").unwrap_or_else(|_| default_model.to_string());
        let base_url = env::var("MENUGEN_BASE_URL").unwrap_or_else(|_| default_url.to_string());

        let rate_limit_ms = match env::var("MENUGEN_RATE_LIMIT_MS") {
            Ok(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                name: "MENUGEN_RATE_LIMIT_MS".to_string(),
                value: v,
            })?,
            Err(_) => 0,
        };

        Ok(Self {
            kind,
            api_key,
            model,
            base_url,
            rate_limit_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_accepts_aliases() {
        assert_eq!(ProviderKind::parse("OpenRouter").unwrap(), ProviderKind::OpenRouter);
        assert_eq!(ProviderKind::parse("claude").unwrap(), ProviderKind::Anthropic);
        assert_eq!(ProviderKind::parse(" fake ").unwrap(), ProviderKind::Fake);
        assert!(matches!(
            ProviderKind::parse("bard"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
