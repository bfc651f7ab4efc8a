//! Fake text provider for tests and offline runs.
//!
//! Replies are matched by checking whether the request text contains a
//! registered substring, so tests run without network access or API costs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use super::client::{ProviderError, TextProvider};
use super::types::{CompletionRequest, CompletionResponse, TokenUsage};

/// Usage reported for every successful fake reply.
pub const FAKE_USAGE: TokenUsage = TokenUsage {
    prompt_tokens: 400,
    completion_tokens: 300,
    total_tokens: 700,
};

const OFFLINE_FIXED_RECIPE_REPLY: &str = r#"{
  "description": "Prepared to order from the approved recipe.",
  "nutrition": {"calories": 400, "protein": 20, "carbs": 40, "fat": 15},
  "allergen_ingredients": []
}"#;

const OFFLINE_ITEM_REPLY: &str = r#"{
  "description": "A house favourite, prepared fresh to order.",
  "recipe": [{"ingredient_name": "House ingredient", "quantity": "200 g"}],
  "nutrition": {"calories": 400, "protein": 20, "carbs": 40, "fat": 15},
  "allergen_ingredients": []
}"#;

const OFFLINE_MATCH_REPLY: &str = r#"{"matches": []}"#;

const OFFLINE_NUTRITION_REPLY: &str = r#"{"calories_per_100g": 100, "protein_per_100g": 5, "carbs_per_100g": 10, "fat_per_100g": 4}"#;

/// A fake provider with scripted replies and scripted transient failures.
///
/// Patterns are checked in registration order, case-insensitively.
#[derive(Debug, Default)]
pub struct FakeProvider {
    responses: RwLock<Vec<(String, String)>>,
    default_response: Option<String>,
    /// Pattern -> number of upcoming matching calls that should fail.
    failures: Mutex<HashMap<String, usize>>,
    /// Pattern -> HTTP status every matching call is rejected with.
    rejections: Mutex<Vec<(String, u16)>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeProvider {
    /// Create a new FakeProvider with no registered responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a FakeProvider that returns a specific response for requests containing a substring.
    pub fn with_response(pattern: &str, response: &str) -> Self {
        let provider = Self::new();
        provider.add_response(pattern, response);
        provider
    }

    /// A provider answering every request kind with fixed placeholder content,
    /// for dry runs without network access.
    pub fn offline() -> Self {
        let provider = Self::new();
        provider.add_response("The recipe is FIXED", OFFLINE_FIXED_RECIPE_REPLY);
        provider.add_response("Menu item:", OFFLINE_ITEM_REPLY);
        provider.add_response("Candidates:", OFFLINE_MATCH_REPLY);
        provider.add_response("per 100 g", OFFLINE_NUTRITION_REPLY);
        provider
    }

    /// Add a response for requests containing a specific substring.
    pub fn add_response(&self, pattern: &str, response: &str) {
        self.responses
            .write()
            .unwrap()
            .push((pattern.to_lowercase(), response.to_string()));
    }

    /// Set the response used when no pattern matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Make the next `times` calls containing `pattern` fail with a transport error.
    pub fn fail_times(&self, pattern: &str, times: usize) {
        self.failures
            .lock()
            .unwrap()
            .insert(pattern.to_lowercase(), times);
    }

    /// Reject every call containing `pattern` with an API error of `status`.
    pub fn reject(&self, pattern: &str, status: u16) {
        self.rejections
            .lock()
            .unwrap()
            .push((pattern.to_lowercase(), status));
    }

    /// Total number of calls received, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of calls whose request text contained `pattern`.
    pub fn calls_matching(&self, pattern: &str) -> usize {
        let pattern = pattern.to_lowercase();
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.full_text().to_lowercase().contains(&pattern))
            .count()
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn take_failure(&self, text: &str) -> bool {
        let mut failures = self.failures.lock().unwrap();
        for (pattern, remaining) in failures.iter_mut() {
            if *remaining > 0 && text.contains(pattern.as_str()) {
                *remaining -= 1;
                return true;
            }
        }
        false
    }
}

#[async_trait]
impl TextProvider for FakeProvider {
    async fn complete(
        &self,
        request_name: &str,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = request.full_text().to_lowercase();
        self.requests.lock().unwrap().push(request);

        let rejection = self
            .rejections
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| text.contains(pattern.as_str()))
            .map(|(_, status)| *status);
        if let Some(status) = rejection {
            return Err(ProviderError::ApiError {
                status,
                message: format!("FakeProvider: scripted rejection for {}", request_name),
            });
        }

        if self.take_failure(&text) {
            return Err(ProviderError::RequestFailed(format!(
                "FakeProvider: scripted failure for {}",
                request_name
            )));
        }

        let responses = self.responses.read().unwrap();
        let content = responses
            .iter()
            .find(|(pattern, _)| text.contains(pattern.as_str()))
            .map(|(_, response)| response.clone())
            .or_else(|| self.default_response.clone());

        match content {
            Some(content) => Ok(CompletionResponse {
                content,
                usage: FAKE_USAGE,
            }),
            None => Err(ProviderError::RequestFailed(format!(
                "FakeProvider: No response configured for {} (first 100 chars): {}",
                request_name,
                text.chars().take(100).collect::<String>()
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
