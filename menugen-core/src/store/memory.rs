//! In-memory store with failure injection, for tests and dry runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{vocabulary_of, IngredientStore, ItemStore, StoreError, UsageStore};
use crate::types::{
    ingredient_key, CachedRecord, IngredientRecord, Language, UsageLogEntry,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<(String, String), CachedRecord>>,
    ingredients: Mutex<HashMap<(String, Language), IngredientRecord>>,
    usage: Mutex<Vec<UsageLogEntry>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    item_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read (items, ingredients, usage) fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful item writes.
    pub fn item_writes(&self) -> usize {
        self.item_writes.load(Ordering::SeqCst)
    }

    pub fn usage_entries(&self) -> Vec<UsageLogEntry> {
        self.usage.lock().unwrap().clone()
    }

    pub fn ingredient_count(&self) -> usize {
        self.ingredients.lock().unwrap().len()
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn get_item(
        &self,
        tenant_id: &str,
        item_id: &str,
    ) -> Result<Option<CachedRecord>, StoreError> {
        self.check_read()?;
        let items = self.items.lock().unwrap();
        Ok(items
            .get(&(tenant_id.to_string(), item_id.to_string()))
            .cloned())
    }

    async fn put_item(&self, record: CachedRecord) -> Result<(), StoreError> {
        self.check_write()?;
        let key = (record.tenant_id.clone(), record.result.item_id.clone());
        self.items.lock().unwrap().insert(key, record);
        self.item_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn tenant_vocabulary(&self, tenant_id: &str) -> Result<Vec<String>, StoreError> {
        self.check_read()?;
        let items = self.items.lock().unwrap();
        Ok(vocabulary_of(
            items.values().filter(|r| r.tenant_id == tenant_id),
        ))
    }
}

#[async_trait]
impl IngredientStore for MemoryStore {
    async fn get_ingredient(
        &self,
        name: &str,
        language: Language,
    ) -> Result<Option<IngredientRecord>, StoreError> {
        self.check_read()?;
        let ingredients = self.ingredients.lock().unwrap();
        Ok(ingredients.get(&(ingredient_key(name), language)).cloned())
    }

    async fn upsert_ingredient(&self, record: IngredientRecord) -> Result<(), StoreError> {
        self.check_write()?;
        self.ingredients.lock().unwrap().insert(record.key(), record);
        Ok(())
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn append_usage(&self, entry: UsageLogEntry) -> Result<(), StoreError> {
        self.check_write()?;
        self.usage.lock().unwrap().push(entry);
        Ok(())
    }

    async fn usage_since(
        &self,
        tenant_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<UsageLogEntry>, StoreError> {
        self.check_read()?;
        let usage = self.usage.lock().unwrap();
        Ok(usage
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.created_at >= since)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerationResult, GuardFields, RecipeLine, RequestType};
    use chrono::Duration;

    fn record(tenant: &str, id: &str, name: &str, ingredients: &[&str]) -> CachedRecord {
        let mut result = GenerationResult::empty(id, Language::Romanian);
        result.description = format!("{} description", name);
        result.recipe = ingredients
            .iter()
            .map(|i| RecipeLine::new(*i, "100 g"))
            .collect();
        CachedRecord {
            tenant_id: tenant.to_string(),
            result,
            guard: GuardFields {
                name: name.to_string(),
                language_override: None,
            },
            excluded: false,
        }
    }

    fn usage(tenant: &str, cost: f64, created_at: DateTime<Utc>) -> UsageLogEntry {
        UsageLogEntry {
            tenant_id: tenant.to_string(),
            item_id: None,
            request_type: RequestType::ItemGeneration,
            tokens_used: 100,
            cost_estimate: cost,
            processing_time_ms: 10,
            error: None,
            created_at,
        }
    }

    #[tokio::test]
    async fn items_are_scoped_per_tenant() {
        let store = MemoryStore::new();
        store.put_item(record("t1", "a", "Ciorbă", &[])).await.unwrap();

        assert!(store.get_item("t1", "a").await.unwrap().is_some());
        assert!(store.get_item("t2", "a").await.unwrap().is_none());
        assert_eq!(store.item_writes(), 1);
    }

    #[tokio::test]
    async fn lists_missing_and_stale_items() {
        let store = MemoryStore::new();
        store.put_item(record("t1", "a", "Ciorbă", &[])).await.unwrap();
        store.put_item(record("t1", "b", "Sarmale", &[])).await.unwrap();

        let guard = |name: &str| GuardFields {
            name: name.to_string(),
            language_override: None,
        };
        let needing = store
            .list_needing_generation(
                "t1",
                &[
                    ("a".to_string(), guard("Ciorbă")),
                    ("b".to_string(), guard("Sarmale cu mămăligă")),
                    ("c".to_string(), guard("Mici")),
                ],
            )
            .await
            .unwrap();

        assert_eq!(needing, vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn vocabulary_is_sorted_and_distinct() {
        let store = MemoryStore::new();
        store
            .put_item(record("t1", "a", "Ciorbă", &["Smântână", "Burtă de vită"]))
            .await
            .unwrap();
        store
            .put_item(record("t1", "b", "Papanași", &["Smântână", "Brânză de vaci"]))
            .await
            .unwrap();
        store
            .put_item(record("t2", "c", "Other", &["Quinoa"]))
            .await
            .unwrap();

        assert_eq!(
            store.tenant_vocabulary("t1").await.unwrap(),
            vec!["Brânză de vaci", "Burtă de vită", "Smântână"]
        );
    }

    #[tokio::test]
    async fn sums_cost_since_cutoff() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.append_usage(usage("t1", 1.5, now)).await.unwrap();
        store.append_usage(usage("t1", 2.0, now - Duration::days(2))).await.unwrap();
        store.append_usage(usage("t2", 9.0, now)).await.unwrap();

        let spent = store
            .sum_cost_since("t1", now - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(spent, 1.5);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_errors() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        assert!(store.put_item(record("t1", "a", "x", &[])).await.is_err());
        assert_eq!(store.item_writes(), 0);

        store.set_fail_reads(true);
        assert!(store.get_item("t1", "a").await.is_err());
        assert!(store.sum_cost_since("t1", Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn ingredients_upsert_by_name_and_language() {
        let store = MemoryStore::new();
        let mut record = IngredientRecord {
            name: "Usturoi".to_string(),
            language: Language::Romanian,
            calories_per_100g: 149.0,
            protein_per_100g: 6.4,
            carbs_per_100g: 33.0,
            fat_per_100g: 0.5,
        };
        store.upsert_ingredient(record.clone()).await.unwrap();
        record.calories_per_100g = 150.0;
        store.upsert_ingredient(record).await.unwrap();

        let stored = store
            .get_ingredient(" usturoi ", Language::Romanian)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.calories_per_100g, 150.0);
        assert_eq!(store.ingredient_count(), 1);
        assert!(store
            .get_ingredient("usturoi", Language::English)
            .await
            .unwrap()
            .is_none());
    }
}
