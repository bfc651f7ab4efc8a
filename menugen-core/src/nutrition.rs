//! Per-ingredient nutrition backfill.
//!
//! Missing ingredients are fetched from the provider in small concurrent
//! sub-batches and upserted into the ingredient store. The product-level
//! estimate itself is returned unchanged.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;

use crate::generation::{with_backoff, GenerationClient, RetryPolicy};
use crate::store::IngredientStore;
use crate::types::{ingredient_key, IngredientRecord, Language, Nutrition, RequestType};
use crate::usage::{Attempt, UsageLogger};

pub const DEFAULT_NUTRITION_BATCH_SIZE: usize = 5;
pub const DEFAULT_NUTRITION_BATCH_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq)]
pub struct NutritionReport {
    /// Product-level estimate, passed through as given.
    pub nutrition: Nutrition,
    pub already_known: usize,
    pub fetched: usize,
    pub failed: Vec<String>,
    pub cost: f64,
}

#[derive(Debug)]
pub struct NutritionEnhancer {
    client: GenerationClient,
    store: Arc<dyn IngredientStore>,
    usage: UsageLogger,
    retry: RetryPolicy,
    batch_size: usize,
    batch_delay: Duration,
}

impl NutritionEnhancer {
    pub fn new(
        client: GenerationClient,
        store: Arc<dyn IngredientStore>,
        usage: UsageLogger,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            store,
            usage,
            retry,
            batch_size: DEFAULT_NUTRITION_BATCH_SIZE,
            batch_delay: DEFAULT_NUTRITION_BATCH_DELAY,
        }
    }

    pub fn with_batching(mut self, batch_size: usize, batch_delay: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.batch_delay = batch_delay;
        self
    }

    /// Backfill nutrition for `ingredients` and return `product` unchanged.
    pub async fn enhance(
        &self,
        tenant_id: &str,
        item_id: &str,
        language: Language,
        ingredients: &[String],
        product: Nutrition,
    ) -> NutritionReport {
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        let mut already_known = 0;

        for name in ingredients {
            if name.trim().is_empty() || !seen.insert(ingredient_key(name)) {
                continue;
            }
            match self.store.get_ingredient(name, language).await {
                Ok(Some(_)) => already_known += 1,
                Ok(None) => missing.push(name.trim().to_string()),
                Err(e) => {
                    tracing::warn!(ingredient = %name, error = %e, "Ingredient lookup failed, refetching");
                    missing.push(name.trim().to_string());
                }
            }
        }

        let mut report = NutritionReport {
            nutrition: product,
            already_known,
            fetched: 0,
            failed: Vec::new(),
            cost: 0.0,
        };

        for (index, chunk) in missing.chunks(self.batch_size).enumerate() {
            if index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            let results = join_all(
                chunk
                    .iter()
                    .map(|name| self.fetch_one(tenant_id, item_id, language, name)),
            )
            .await;

            for (name, (stored, cost)) in chunk.iter().zip(results) {
                report.cost += cost;
                if stored {
                    report.fetched += 1;
                } else {
                    report.failed.push(name.clone());
                }
            }
        }

        tracing::debug!(
            item_id,
            known = report.already_known,
            fetched = report.fetched,
            failed = report.failed.len(),
            "Ingredient nutrition backfilled"
        );
        report
    }

    /// Fetch and store one ingredient. Returns whether it was stored, and the cost.
    async fn fetch_one(
        &self,
        tenant_id: &str,
        item_id: &str,
        language: Language,
        name: &str,
    ) -> (bool, f64) {
        let client = &self.client;
        let usage = &self.usage;

        let outcome = with_backoff(&self.retry, "ingredient_nutrition", |_| async move {
            let started = Instant::now();
            let result = client.ingredient_nutrition(name, language).await;
            let cost = usage
                .record(Attempt {
                    tenant_id,
                    item_id: Some(item_id),
                    request_type: RequestType::IngredientNutrition,
                    elapsed: started.elapsed(),
                    outcome: result.as_ref().map(|m| m.usage),
                })
                .await;
            result.map(|m| (m.value, cost))
        })
        .await;

        let (values, cost) = match outcome.result {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    ingredient = name,
                    attempts = outcome.attempts,
                    error = %e,
                    "Ingredient nutrition unavailable"
                );
                return (false, 0.0);
            }
        };

        let record = IngredientRecord {
            name: name.to_string(),
            language,
            calories_per_100g: values.calories_per_100g,
            protein_per_100g: values.protein_per_100g,
            carbs_per_100g: values.carbs_per_100g,
            fat_per_100g: values.fat_per_100g,
        };
        if let Err(e) = self.store.upsert_ingredient(record).await {
            tracing::warn!(ingredient = name, error = %e, "Failed to store ingredient nutrition");
            return (false, cost);
        }
        (true, cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::FakeProvider;
    use crate::generation::GenerationSettings;
    use crate::store::MemoryStore;
    use crate::usage::Pricing;

    const GARLIC: &str = r#"{"calories_per_100g": 149, "protein_per_100g": 6.4, "carbs_per_100g": 33, "fat_per_100g": 0.5}"#;

    fn enhancer(provider: FakeProvider) -> (Arc<FakeProvider>, Arc<MemoryStore>, NutritionEnhancer) {
        let provider = Arc::new(provider);
        let store = Arc::new(MemoryStore::new());
        let client = GenerationClient::new(provider.clone(), GenerationSettings::default());
        let usage = UsageLogger::new(store.clone(), Pricing::default());
        let enhancer = NutritionEnhancer::new(client, store.clone(), usage, RetryPolicy::immediate(1))
            .with_batching(2, Duration::ZERO);
        (provider, store, enhancer)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn fetches_missing_and_keeps_product_estimate() {
        let (provider, store, enhancer) = enhancer(FakeProvider::new().with_default_response(GARLIC));
        let product = Nutrition {
            calories: 420.0,
            protein: 20.0,
            carbs: 30.0,
            fat: 18.0,
        };

        let report = enhancer
            .enhance(
                "t1",
                "a",
                Language::Romanian,
                &strings(&["Usturoi", "Ceapă", "usturoi", "Ardei", " "]),
                product,
            )
            .await;

        assert_eq!(report.nutrition, product);
        assert_eq!(report.fetched, 3);
        assert_eq!(provider.call_count(), 3);
        assert_eq!(store.ingredient_count(), 3);
        assert!(report.cost > 0.0);
    }

    #[tokio::test]
    async fn known_ingredients_are_not_refetched() {
        let (provider, _, enhancer) = enhancer(FakeProvider::new().with_default_response(GARLIC));
        let names = strings(&["Usturoi"]);

        enhancer
            .enhance("t1", "a", Language::Romanian, &names, Nutrition::default())
            .await;
        let second = enhancer
            .enhance("t1", "b", Language::Romanian, &names, Nutrition::default())
            .await;

        assert_eq!(second.already_known, 1);
        assert_eq!(second.fetched, 0);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn failures_are_retried_then_reported() {
        let provider = FakeProvider::with_response("Usturoi", GARLIC);
        provider.fail_times("Usturoi", 1);
        let (provider, store, enhancer) = enhancer(provider);

        let report = enhancer
            .enhance("t1", "a", Language::Romanian, &strings(&["Usturoi", "Trufe"]), Nutrition::default())
            .await;

        assert_eq!(report.fetched, 1);
        assert_eq!(report.failed, vec!["Trufe".to_string()]);
        // Usturoi: one failure + one success. Trufe: two failures.
        assert_eq!(provider.call_count(), 4);
        assert_eq!(store.usage_entries().len(), 4);
    }
}
