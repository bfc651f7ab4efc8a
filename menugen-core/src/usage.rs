//! Usage logging and cost estimation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::ai::TokenUsage;
use crate::error::GenerationError;
use crate::store::UsageStore;
use crate::types::{RequestType, UsageLogEntry};

/// Default USD price per 1K prompt tokens.
pub const DEFAULT_INPUT_COST_PER_1K: f64 = 0.00015;

/// Default USD price per 1K completion tokens.
pub const DEFAULT_OUTPUT_COST_PER_1K: f64 = 0.0006;

/// Token prices used to estimate what a call cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            input_per_1k: DEFAULT_INPUT_COST_PER_1K,
            output_per_1k: DEFAULT_OUTPUT_COST_PER_1K,
        }
    }
}

impl Pricing {
    pub fn estimate(&self, usage: TokenUsage) -> f64 {
        usage.prompt_tokens as f64 / 1000.0 * self.input_per_1k
            + usage.completion_tokens as f64 / 1000.0 * self.output_per_1k
    }
}

/// What one provider attempt produced, for the log.
#[derive(Debug, Clone)]
pub struct Attempt<'a> {
    pub tenant_id: &'a str,
    pub item_id: Option<&'a str>,
    pub request_type: RequestType,
    pub elapsed: Duration,
    /// Token usage on success; failed attempts are logged at zero cost.
    pub outcome: Result<TokenUsage, &'a GenerationError>,
}

/// Appends one usage-log entry per provider attempt.
#[derive(Debug, Clone)]
pub struct UsageLogger {
    store: Arc<dyn UsageStore>,
    pricing: Pricing,
}

impl UsageLogger {
    pub fn new(store: Arc<dyn UsageStore>, pricing: Pricing) -> Self {
        Self { store, pricing }
    }

    pub fn pricing(&self) -> Pricing {
        self.pricing
    }

    /// Record an attempt and return its estimated cost.
    ///
    /// A failed append is logged and otherwise ignored.
    pub async fn record(&self, attempt: Attempt<'_>) -> f64 {
        let (tokens_used, cost_estimate, error) = match attempt.outcome {
            Ok(usage) => (usage.total_tokens, self.pricing.estimate(usage), None),
            Err(e) => (0, 0.0, Some(e.to_string())),
        };

        let entry = UsageLogEntry {
            tenant_id: attempt.tenant_id.to_string(),
            item_id: attempt.item_id.map(str::to_string),
            request_type: attempt.request_type,
            tokens_used,
            cost_estimate,
            processing_time_ms: attempt.elapsed.as_millis() as u64,
            error,
            created_at: Utc::now(),
        };

        if let Err(e) = self.store.append_usage(entry).await {
            tracing::warn!(
                tenant_id = attempt.tenant_id,
                request_type = ?attempt.request_type,
                error = %e,
                "Failed to append usage log entry"
            );
        }

        cost_estimate
    }
}
