//! Single-item generation state machine.
//!
//! ```text
//! CACHE_LOOKUP -> hit -> DONE
//!              -> miss -> COST_CHECK -> denied -> DONE(error)
//!                                    -> allowed -> FILTERED -> DONE (excluded)
//!                                               -> GENERATING -> NORMALIZING
//!                                                  -> NUTRITION_ENHANCING
//!                                                  -> ALLERGEN_MAPPING -> CACHING -> DONE
//! ```
//!
//! Every outcome, failures included, comes back as an `ItemRecord`.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info_span, Instrument};

use crate::ai::TextProvider;
use crate::allergens::AllergenMapper;
use crate::cache::CacheAdapter;
use crate::config::GenerationConfig;
use crate::cost::CostGovernor;
use crate::error::GenerationError;
use crate::exclusion::check_exclusion;
use crate::generation::{
    with_backoff, GeneratedContent, GenerationClient, GenerationMode, RetryOutcome, RetryPolicy,
};
use crate::language::{Detection, LanguageDetector};
use crate::normalize::{IngredientNormalizer, NormalizedIngredient};
use crate::nutrition::NutritionEnhancer;
use crate::store::Stores;
use crate::types::{
    CachedRecord, GenerationInput, GenerationResult, ItemError, ItemRecord, ItemSource, Language,
    RecipeLine, RequestType, Stage,
};
use crate::usage::{Attempt, UsageLogger};

#[derive(Debug)]
pub struct ItemGenerator {
    cache: CacheAdapter,
    governor: CostGovernor,
    detector: LanguageDetector,
    client: GenerationClient,
    normalizer: IngredientNormalizer,
    nutrition: NutritionEnhancer,
    allergens: AllergenMapper,
    usage: UsageLogger,
    retry: RetryPolicy,
}

/// Elapsed milliseconds since `started`.
fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn transition(item_id: &str, stage: Stage) {
    tracing::debug!(item_id, stage = ?stage, "Item stage");
}

impl ItemGenerator {
    pub fn new(provider: Arc<dyn TextProvider>, stores: Stores, config: &GenerationConfig) -> Self {
        let client = GenerationClient::new(provider, config.settings.clone());
        let usage = UsageLogger::new(stores.usage.clone(), config.pricing);

        Self {
            cache: CacheAdapter::new(stores.items),
            governor: CostGovernor::new(stores.usage, config.daily_cost_limit),
            detector: LanguageDetector::new(config.default_language),
            normalizer: IngredientNormalizer::new(
                client.clone(),
                usage.clone(),
                config.fuzzy_threshold,
            ),
            nutrition: NutritionEnhancer::new(
                client.clone(),
                stores.ingredients,
                usage.clone(),
                config.retry.clone(),
            )
            .with_batching(config.nutrition_batch_size, config.nutrition_batch_delay),
            allergens: AllergenMapper::new(),
            client,
            usage,
            retry: config.retry.clone(),
        }
    }

    pub fn cache(&self) -> &CacheAdapter {
        &self.cache
    }

    pub fn governor(&self) -> &CostGovernor {
        &self.governor
    }

    pub fn detector(&self) -> &LanguageDetector {
        &self.detector
    }

    /// Produce the record for one item, from cache unless `force` is set.
    pub async fn generate(&self, input: &GenerationInput, force: bool) -> ItemRecord {
        if !force {
            let started = Instant::now();
            transition(&input.item_id, Stage::CacheLookup);
            if let Some(record) = self
                .cache
                .get_hit(&input.tenant_id, &input.item_id, &input.guard_fields())
                .await
            {
                return Self::cached(&record, started);
            }
        }
        self.generate_uncached(input).await
    }

    /// Produce the record for an item known to need generation.
    pub async fn generate_uncached(&self, input: &GenerationInput) -> ItemRecord {
        let span = info_span!(
            "generate_item",
            item_id = %input.item_id,
            tenant_id = %input.tenant_id
        );
        self.generate_fresh(input, Instant::now())
            .instrument(span)
            .await
    }

    /// Record for an already-validated cache hit.
    pub fn cached(record: &CachedRecord, started: Instant) -> ItemRecord {
        tracing::debug!(item_id = %record.result.item_id, "Cache hit");
        let mut item = ItemRecord::from_result(&record.result, ItemSource::Cached);
        item.processing_time_ms = elapsed_ms(started);
        item
    }

    /// Run everything after the cache lookup.
    async fn generate_fresh(&self, input: &GenerationInput, started: Instant) -> ItemRecord {
        let item_id = input.item_id.as_str();
        let tenant_id = input.tenant_id.as_str();
        let detection = self.detector.resolve(&input.name, input.language_override);
        let language = detection.language;

        transition(item_id, Stage::CostCheck);
        if let Err(e) = self.governor.check(tenant_id).await {
            return self.failed(input, &detection, Stage::CostCheck, e, 0, started);
        }

        transition(item_id, Stage::Filtered);
        if let Some(rule) = check_exclusion(&input.name) {
            tracing::debug!(item_id, category = ?rule.category, matched = %rule.matched, "Item excluded");
            let result = GenerationResult::empty(item_id, language);
            self.cache
                .put(tenant_id, &result, input.guard_fields(), true)
                .await;
            return self.finish(&result, ItemSource::Excluded, &detection, 0.0, 0, started);
        }

        transition(item_id, Stage::Generating);
        let fixed_recipe = input
            .approved_recipe
            .as_deref()
            .filter(|recipe| !recipe.is_empty());
        let mode = if fixed_recipe.is_some() {
            GenerationMode::DescriptionOnly
        } else {
            GenerationMode::Full
        };

        let outcome = self
            .generate_with_retry(input, language, mode, fixed_recipe)
            .await;
        let (mut content, mut cost) = match outcome.result {
            Ok(generated) => generated,
            Err(e) => {
                return self.failed(input, &detection, Stage::Generating, e, outcome.attempts, started)
            }
        };

        if mode == GenerationMode::Full {
            transition(item_id, Stage::Normalizing);
            let vocabulary = self.cache.tenant_vocabulary(tenant_id).await;
            let names: Vec<String> = content
                .recipe
                .iter()
                .map(|line| line.ingredient_name.clone())
                .collect();
            let normalized = self
                .normalizer
                .normalize(tenant_id, Some(item_id), language, &names, &vocabulary)
                .await;
            cost += normalized.cost;
            apply_canonical_names(&mut content, &normalized.ingredients);
        }

        transition(item_id, Stage::NutritionEnhancing);
        let names: Vec<String> = content
            .recipe
            .iter()
            .map(|line| line.ingredient_name.clone())
            .collect();
        let report = self
            .nutrition
            .enhance(tenant_id, item_id, language, &names, content.nutrition)
            .await;
        cost += report.cost;

        transition(item_id, Stage::AllergenMapping);
        let allergen_codes = self.allergens.map(&content.allergen_candidates, language);

        transition(item_id, Stage::Caching);
        let result = GenerationResult {
            item_id: item_id.to_string(),
            language,
            description: content.description,
            recipe: content.recipe,
            nutrition: report.nutrition,
            allergen_codes,
            generated_at: Utc::now(),
        };
        self.cache
            .put(tenant_id, &result, input.guard_fields(), false)
            .await;

        self.finish(
            &result,
            ItemSource::Generated,
            &detection,
            cost,
            outcome.attempts,
            started,
        )
    }

    /// The GENERATING stage: provider calls under the retry policy, one usage entry per attempt.
    async fn generate_with_retry(
        &self,
        input: &GenerationInput,
        language: Language,
        mode: GenerationMode,
        fixed_recipe: Option<&[RecipeLine]>,
    ) -> RetryOutcome<(GeneratedContent, f64)> {
        let client = &self.client;
        let usage = &self.usage;
        let name = input.name.as_str();
        let tenant_id = input.tenant_id.as_str();
        let item_id = input.item_id.as_str();

        with_backoff(&self.retry, "item_generation", |attempt| async move {
            tracing::debug!(item_id, attempt, "Calling provider");
            let started = Instant::now();
            let result = client.generate(name, language, mode, fixed_recipe).await;
            let cost = usage
                .record(Attempt {
                    tenant_id,
                    item_id: Some(item_id),
                    request_type: RequestType::ItemGeneration,
                    elapsed: started.elapsed(),
                    outcome: result.as_ref().map(|c| c.usage),
                })
                .await;
            result.map(|content| (content, cost))
        })
        .await
    }

    fn finish(
        &self,
        result: &GenerationResult,
        source: ItemSource,
        detection: &Detection,
        cost: f64,
        attempts: u32,
        started: Instant,
    ) -> ItemRecord {
        transition(&result.item_id, Stage::Done);
        let mut item = ItemRecord::from_result(result, source);
        item.language_confidence = Some(detection.confidence);
        item.cost = cost;
        item.attempts = attempts;
        item.processing_time_ms = elapsed_ms(started);
        item
    }

    fn failed(
        &self,
        input: &GenerationInput,
        detection: &Detection,
        stage: Stage,
        error: GenerationError,
        attempts: u32,
        started: Instant,
    ) -> ItemRecord {
        tracing::warn!(
            item_id = %input.item_id,
            stage = ?stage,
            attempts,
            error = %error,
            "Item generation failed"
        );
        let mut item = ItemRecord::failed(
            input.item_id.clone(),
            detection.language,
            ItemError {
                kind: error.kind().to_string(),
                message: error.to_string(),
                stage,
            },
        );
        item.language_confidence = Some(detection.confidence);
        item.attempts = attempts;
        item.processing_time_ms = elapsed_ms(started);
        item
    }
}

/// Rewrite recipe ingredient names to their canonical vocabulary spelling.
fn apply_canonical_names(content: &mut GeneratedContent, normalized: &[NormalizedIngredient]) {
    for (line, ingredient) in content.recipe.iter_mut().zip(normalized) {
        if line.ingredient_name == ingredient.original {
            line.ingredient_name = ingredient.canonical.clone();
        }
    }
}
