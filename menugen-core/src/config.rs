//! Pipeline configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::ai::ConfigError;
use crate::cost::DEFAULT_DAILY_COST_LIMIT;
use crate::generation::{GenerationSettings, RetryPolicy};
use crate::normalize::DEFAULT_FUZZY_THRESHOLD;
use crate::nutrition::{DEFAULT_NUTRITION_BATCH_DELAY, DEFAULT_NUTRITION_BATCH_SIZE};
use crate::types::Language;
use crate::usage::Pricing;

pub const DEFAULT_MAX_BATCH_SIZE: usize = 10;
pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_WINDOW_DELAY: Duration = Duration::from_millis(1000);

/// Longest accepted item name, in characters.
pub const MAX_NAME_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub max_batch_size: usize,
    /// Items generated concurrently within one window.
    pub concurrency: usize,
    /// Pause between concurrency windows.
    pub window_delay: Duration,
    pub retry: RetryPolicy,
    /// Daily spend ceiling per tenant, in USD.
    pub daily_cost_limit: f64,
    pub default_language: Language,
    pub nutrition_batch_size: usize,
    pub nutrition_batch_delay: Duration,
    pub fuzzy_threshold: f64,
    pub settings: GenerationSettings,
    pub pricing: Pricing,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            window_delay: DEFAULT_WINDOW_DELAY,
            retry: RetryPolicy::default(),
            daily_cost_limit: DEFAULT_DAILY_COST_LIMIT,
            default_language: Language::Romanian,
            nutrition_batch_size: DEFAULT_NUTRITION_BATCH_SIZE,
            nutrition_batch_delay: DEFAULT_NUTRITION_BATCH_DELAY,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            settings: GenerationSettings::default(),
            pricing: Pricing::default(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        })
}

/// Read an optional variable through `lookup`, parsing it if set.
fn optional<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError> {
    lookup(name).map(|v| parse_var(name, v)).transpose()
}

impl GenerationConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// - `MENUGEN_MAX_BATCH_SIZE`, `MENUGEN_CONCURRENCY`, `MENUGEN_WINDOW_DELAY_MS`
    /// - `MENUGEN_MAX_RETRIES`, `MENUGEN_RETRY_BASE_DELAY_MS`, `MENUGEN_RETRY_MAX_DELAY_MS`
    /// - `MENUGEN_DAILY_COST_LIMIT`, `MENUGEN_DEFAULT_LANGUAGE`
    /// - `MENUGEN_NUTRITION_BATCH_SIZE`, `MENUGEN_NUTRITION_BATCH_DELAY_MS`
    /// - `MENUGEN_FUZZY_THRESHOLD`
    /// - `MENUGEN_TEMPERATURE`, `MENUGEN_MAX_OUTPUT_TOKENS`
    /// - `MENUGEN_INPUT_COST_PER_1K`, `MENUGEN_OUTPUT_COST_PER_1K`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let millis = |ms: u64| Duration::from_millis(ms);

        if let Some(v) = optional(&lookup, "MENUGEN_MAX_BATCH_SIZE")? {
            config.max_batch_size = v;
        }
        if let Some(v) = optional::<usize>(&lookup, "MENUGEN_CONCURRENCY")? {
            config.concurrency = v.max(1);
        }
        if let Some(v) = optional(&lookup, "MENUGEN_WINDOW_DELAY_MS")? {
            config.window_delay = millis(v);
        }
        if let Some(v) = optional(&lookup, "MENUGEN_MAX_RETRIES")? {
            config.retry.max_retries = v;
        }
        if let Some(v) = optional(&lookup, "MENUGEN_RETRY_BASE_DELAY_MS")? {
            config.retry.base_delay = millis(v);
        }
        if let Some(v) = optional(&lookup, "MENUGEN_RETRY_MAX_DELAY_MS")? {
            config.retry.max_delay = millis(v);
        }
        if let Some(v) = optional(&lookup, "MENUGEN_DAILY_COST_LIMIT")? {
            config.daily_cost_limit = v;
        }
        if let Some(code) = lookup("MENUGEN_DEFAULT_LANGUAGE") {
            config.default_language =
                Language::from_code(&code).ok_or_else(|| ConfigError::InvalidValue {
                    name: "MENUGEN_DEFAULT_LANGUAGE".to_string(),
                    value: code.clone(),
                })?;
        }
        if let Some(v) = optional::<usize>(&lookup, "MENUGEN_NUTRITION_BATCH_SIZE")? {
            config.nutrition_batch_size = v.max(1);
        }
        if let Some(v) = optional(&lookup, "MENUGEN_NUTRITION_BATCH_DELAY_MS")? {
            config.nutrition_batch_delay = millis(v);
        }
        if let Some(v) = optional(&lookup, "MENUGEN_FUZZY_THRESHOLD")? {
            config.fuzzy_threshold = v;
        }
        if let Some(v) = optional(&lookup, "MENUGEN_TEMPERATURE")? {
            config.settings.temperature = v;
        }
        if let Some(v) = optional(&lookup, "MENUGEN_MAX_OUTPUT_TOKENS")? {
            config.settings.max_output_tokens = v;
        }
        if let Some(v) = optional(&lookup, "MENUGEN_INPUT_COST_PER_1K")? {
            config.pricing.input_per_1k = v;
        }
        if let Some(v) = optional(&lookup, "MENUGEN_OUTPUT_COST_PER_1K")? {
            config.pricing.output_per_1k = v;
        }

        Ok(config)
    }
}
