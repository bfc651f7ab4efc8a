//! Cache adapter over the item store.
//!
//! Read failures count as "needs generation" and write failures are logged
//! and swallowed, so store trouble never fails an item.

use std::sync::Arc;

use crate::store::ItemStore;
use crate::types::{CachedRecord, GenerationResult, GuardFields};

#[derive(Debug, Clone)]
pub struct CacheAdapter {
    store: Arc<dyn ItemStore>,
}

impl CacheAdapter {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// The cached record for an item, or `None` if absent or unreadable.
    pub async fn get(&self, tenant_id: &str, item_id: &str) -> Option<CachedRecord> {
        match self.store.get_item(tenant_id, item_id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(tenant_id, item_id, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// A cached result that is still valid for `guard`.
    pub async fn get_hit(
        &self,
        tenant_id: &str,
        item_id: &str,
        guard: &GuardFields,
    ) -> Option<CachedRecord> {
        self.get(tenant_id, item_id)
            .await
            .filter(|record| record.is_hit_for(guard))
    }

    /// Persist a result. Returns whether the write succeeded.
    pub async fn put(
        &self,
        tenant_id: &str,
        result: &GenerationResult,
        guard: GuardFields,
        excluded: bool,
    ) -> bool {
        let record = CachedRecord {
            tenant_id: tenant_id.to_string(),
            result: result.clone(),
            guard,
            excluded,
        };

        match self.store.put_item(record).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    tenant_id,
                    item_id = %result.item_id,
                    error = %e,
                    "Cache write failed, returning unsaved result"
                );
                false
            }
        }
    }

    /// Ids that need generation. If the store cannot answer, every id does.
    pub async fn list_needing_generation(
        &self,
        tenant_id: &str,
        items: &[(String, GuardFields)],
    ) -> Vec<String> {
        match self.store.list_needing_generation(tenant_id, items).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(tenant_id, error = %e, "Cache lookup failed, regenerating all items");
                items.iter().map(|(id, _)| id.clone()).collect()
            }
        }
    }

    /// The tenant's ingredient vocabulary, empty when unreadable.
    pub async fn tenant_vocabulary(&self, tenant_id: &str) -> Vec<String> {
        match self.store.tenant_vocabulary(tenant_id).await {
            Ok(vocabulary) => vocabulary,
            Err(e) => {
                tracing::warn!(tenant_id, error = %e, "Vocabulary lookup failed");
                Vec::new()
            }
        }
    }
}
