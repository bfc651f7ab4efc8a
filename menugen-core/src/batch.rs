//! Batch orchestration.
//!
//! A batch is validated and cost-checked up front; either failure aborts it
//! with no side effects. After that every input produces exactly one record:
//! cache hits are resolved first, then misses run in fixed-size concurrency
//! windows with a pause between windows.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tracing::{info_span, Instrument};

use crate::ai::TextProvider;
use crate::config::{GenerationConfig, MAX_NAME_CHARS};
use crate::error::GenerationError;
use crate::generator::ItemGenerator;
use crate::store::Stores;
use crate::types::{
    BatchItem, BatchRequest, BatchResponse, BatchSummary, GenerationInput, ItemError, ItemRecord,
    ItemSource, Language, RecipeLine, Stage,
};

#[derive(Debug)]
pub struct BatchOrchestrator {
    generator: ItemGenerator,
    max_batch_size: usize,
    concurrency: usize,
    window_delay: Duration,
}

fn invalid(message: String) -> GenerationError {
    GenerationError::Validation(message)
}

fn to_input(tenant_id: &str, item: &BatchItem) -> Result<GenerationInput, GenerationError> {
    let name = item.name.trim();
    if name.is_empty() {
        return Err(invalid(format!("item {} has an empty name", item.id)));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(invalid(format!(
            "item {} name exceeds {} characters",
            item.id, MAX_NAME_CHARS
        )));
    }

    let mut input = GenerationInput::new(item.id.clone(), name, tenant_id);
    if let Some(code) = &item.language_override {
        let language = Language::from_code(code).ok_or_else(|| {
            invalid(format!(
                "item {} has unsupported language override {:?}",
                item.id, code
            ))
        })?;
        input = input.with_language(language);
    }
    if let Some(recipe) = &item.approved_recipe {
        input = input.with_approved_recipe(recipe.iter().map(RecipeLine::trimmed).collect());
    }
    Ok(input)
}

impl BatchOrchestrator {
    pub fn new(generator: ItemGenerator, config: &GenerationConfig) -> Self {
        Self {
            generator,
            max_batch_size: config.max_batch_size,
            concurrency: config.concurrency.max(1),
            window_delay: config.window_delay,
        }
    }

    /// Wire a generator and orchestrator over the given provider and stores.
    pub fn build(provider: Arc<dyn TextProvider>, stores: Stores, config: &GenerationConfig) -> Self {
        Self::new(ItemGenerator::new(provider, stores, config), config)
    }

    pub fn generator(&self) -> &ItemGenerator {
        &self.generator
    }

    /// Check batch-level constraints and convert items to generation inputs.
    pub fn validate(&self, request: &BatchRequest) -> Result<Vec<GenerationInput>, GenerationError> {
        if request.tenant_id.trim().is_empty() {
            return Err(invalid("tenant_id is empty".to_string()));
        }
        if request.items.len() > self.max_batch_size {
            return Err(invalid(format!(
                "batch has {} items, maximum is {}",
                request.items.len(),
                self.max_batch_size
            )));
        }

        let mut seen = HashSet::new();
        for item in &request.items {
            if item.id.trim().is_empty() {
                return Err(invalid("item with empty id".to_string()));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(invalid(format!("duplicate item id {}", item.id)));
            }
        }

        request
            .items
            .iter()
            .map(|item| to_input(&request.tenant_id, item))
            .collect()
    }

    /// Run a batch. Only validation and the tenant's cost ceiling can fail it.
    pub async fn run(&self, request: &BatchRequest) -> Result<BatchResponse, GenerationError> {
        let span = info_span!(
            "generate_batch",
            tenant_id = %request.tenant_id,
            items = request.items.len(),
            force = request.force_regeneration
        );
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: &BatchRequest) -> Result<BatchResponse, GenerationError> {
        let started = Instant::now();
        let inputs = self.validate(request)?;
        let tenant_id = request.tenant_id.as_str();

        self.generator.governor().check(tenant_id).await?;

        let mut slots: Vec<Option<ItemRecord>> = vec![None; inputs.len()];
        let mut pending: Vec<usize> = Vec::new();

        if request.force_regeneration {
            pending.extend(0..inputs.len());
        } else {
            let guards: Vec<_> = inputs
                .iter()
                .map(|i| (i.item_id.clone(), i.guard_fields()))
                .collect();
            let needing: HashSet<String> = self
                .generator
                .cache()
                .list_needing_generation(tenant_id, &guards)
                .await
                .into_iter()
                .collect();

            // Resolve every cache hit before any generation call is issued.
            for (index, input) in inputs.iter().enumerate() {
                if needing.contains(&input.item_id) {
                    pending.push(index);
                    continue;
                }
                let lookup_started = Instant::now();
                match self
                    .generator
                    .cache()
                    .get_hit(tenant_id, &input.item_id, &input.guard_fields())
                    .await
                {
                    Some(record) => {
                        slots[index] = Some(ItemGenerator::cached(&record, lookup_started))
                    }
                    None => pending.push(index),
                }
            }
        }

        tracing::debug!(
            cached = inputs.len() - pending.len(),
            pending = pending.len(),
            "Batch partitioned"
        );

        for (window_index, window) in pending.chunks(self.concurrency).enumerate() {
            if window_index > 0 && !self.window_delay.is_zero() {
                tokio::time::sleep(self.window_delay).await;
            }

            let records = join_all(
                window
                    .iter()
                    .map(|&index| self.generator.generate_uncached(&inputs[index])),
            )
            .await;

            for (&index, record) in window.iter().zip(records) {
                slots[index] = Some(record);
            }
        }

        let items: Vec<ItemRecord> = slots
            .into_iter()
            .zip(&inputs)
            .map(|(slot, input)| {
                slot.unwrap_or_else(|| {
                    // Every index is either cached or pending, so this is unreachable.
                    ItemRecord::failed(
                        input.item_id.clone(),
                        input
                            .language_override
                            .unwrap_or(self.generator.detector().default_language()),
                        ItemError {
                            kind: "internal".to_string(),
                            message: "item was not processed".to_string(),
                            stage: Stage::Done,
                        },
                    )
                })
            })
            .collect();

        let summary = summarize(&items, started.elapsed());
        tracing::info!(
            total = summary.total,
            cached = summary.cached_count,
            generated = summary.generated_count,
            excluded = summary.excluded_count,
            failed = summary.failed_count,
            total_cost = summary.total_cost,
            elapsed_ms = summary.total_processing_time_ms,
            "Batch complete"
        );

        Ok(BatchResponse { items, summary })
    }
}

/// Aggregate counters over a batch's records.
pub fn summarize(items: &[ItemRecord], elapsed: Duration) -> BatchSummary {
    let mut summary = BatchSummary {
        total: items.len(),
        total_processing_time_ms: elapsed.as_millis() as u64,
        ..Default::default()
    };

    for item in items {
        summary.total_cost += item.cost;
        match item.source {
            ItemSource::Cached => summary.cached_count += 1,
            ItemSource::Generated => summary.generated_count += 1,
            ItemSource::Excluded => summary.excluded_count += 1,
            ItemSource::Failed => summary.failed_count += 1,
        }
    }
    summary
}
