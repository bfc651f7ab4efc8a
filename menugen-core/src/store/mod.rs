//! Persistence collaborators.
//!
//! The generation core never owns its storage; it talks to three narrow
//! traits instead:
//! - `ItemStore` for cached item results and the tenant's recipe vocabulary
//! - `IngredientStore` for per-100g ingredient nutrition keyed by `(name, language)`
//! - `UsageStore` for the append-only usage log the cost governor sums over
//!
//! `MemoryStore` backs tests and `DiskStore` backs the CLI.

mod disk;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

use crate::types::{CachedRecord, GuardFields, IngredientRecord, Language, UsageLogEntry};

pub use disk::DiskStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize stored record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ItemStore: Send + Sync + Debug {
    async fn get_item(
        &self,
        tenant_id: &str,
        item_id: &str,
    ) -> Result<Option<CachedRecord>, StoreError>;

    /// Insert or replace the record for `(record.tenant_id, record.result.item_id)`.
    async fn put_item(&self, record: CachedRecord) -> Result<(), StoreError>;

    /// Ids of items that have no usable cached content for the given guard fields.
    async fn list_needing_generation(
        &self,
        tenant_id: &str,
        items: &[(String, GuardFields)],
    ) -> Result<Vec<String>, StoreError> {
        let mut needing = Vec::new();
        for (item_id, guard) in items {
            let hit = self
                .get_item(tenant_id, item_id)
                .await?
                .is_some_and(|record| record.is_hit_for(guard));
            if !hit {
                needing.push(item_id.clone());
            }
        }
        Ok(needing)
    }

    /// Distinct ingredient names across every cached recipe of a tenant, sorted.
    async fn tenant_vocabulary(&self, tenant_id: &str) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
pub trait IngredientStore: Send + Sync + Debug {
    async fn get_ingredient(
        &self,
        name: &str,
        language: Language,
    ) -> Result<Option<IngredientRecord>, StoreError>;

    async fn upsert_ingredient(&self, record: IngredientRecord) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UsageStore: Send + Sync + Debug {
    async fn append_usage(&self, entry: UsageLogEntry) -> Result<(), StoreError>;

    /// Entries for `tenant_id` created at or after `since`, oldest first.
    async fn usage_since(
        &self,
        tenant_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<UsageLogEntry>, StoreError>;

    async fn sum_cost_since(&self, tenant_id: &str, since: DateTime<Utc>) -> Result<f64, StoreError> {
        Ok(self
            .usage_since(tenant_id, since)
            .await?
            .iter()
            .map(|e| e.cost_estimate)
            .sum())
    }
}

/// The three store handles the pipeline is built on.
#[derive(Debug, Clone)]
pub struct Stores {
    pub items: Arc<dyn ItemStore>,
    pub ingredients: Arc<dyn IngredientStore>,
    pub usage: Arc<dyn UsageStore>,
}

impl Stores {
    /// Use one backend for all three stores.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: ItemStore + IngredientStore + UsageStore + 'static,
    {
        Self {
            items: store.clone(),
            ingredients: store.clone(),
            usage: store,
        }
    }
}

/// Sorted, deduplicated ingredient names from a set of cached records.
pub(crate) fn vocabulary_of<'a>(records: impl IntoIterator<Item = &'a CachedRecord>) -> Vec<String> {
    records
        .into_iter()
        .flat_map(|r| r.result.recipe.iter())
        .map(|line| line.ingredient_name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
