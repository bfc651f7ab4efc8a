//! Per-tenant daily cost ceiling.
//!
//! Today's spend is the sum of usage-log costs since UTC midnight. The check
//! is not atomic with the spend it admits, so the ceiling is a soft cap:
//! concurrent batches may each pass the check before either logs its cost.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::GenerationError;
use crate::store::UsageStore;

/// Default daily ceiling in USD.
pub const DEFAULT_DAILY_COST_LIMIT: f64 = 5.0;

/// Start of the current UTC day.
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now)
}

#[derive(Debug, Clone)]
pub struct CostGovernor {
    store: Arc<dyn UsageStore>,
    daily_limit: f64,
}

impl CostGovernor {
    pub fn new(store: Arc<dyn UsageStore>, daily_limit: f64) -> Self {
        Self { store, daily_limit }
    }

    pub fn daily_limit(&self) -> f64 {
        self.daily_limit
    }

    /// Today's logged spend for a tenant.
    pub async fn spent_today(&self, tenant_id: &str) -> Result<f64, GenerationError> {
        Ok(self
            .store
            .sum_cost_since(tenant_id, start_of_day(Utc::now()))
            .await?)
    }

    /// Admit or deny new generation. Fails open when the ledger can't be read.
    pub async fn check_allowed(&self, tenant_id: &str) -> bool {
        self.check(tenant_id).await.is_ok()
    }

    /// Like `check_allowed`, but reports the spend on denial.
    pub async fn check(&self, tenant_id: &str) -> Result<(), GenerationError> {
        let spent = match self.spent_today(tenant_id).await {
            Ok(spent) => spent,
            Err(e) => {
                tracing::warn!(tenant_id, error = %e, "Cost ledger unavailable, allowing generation");
                return Ok(());
            }
        };

        if spent >= self.daily_limit {
            tracing::debug!(tenant_id, spent, limit = self.daily_limit, "Daily cost limit reached");
            return Err(GenerationError::CostLimit {
                tenant_id: tenant_id.to_string(),
                spent,
                ceiling: self.daily_limit,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{RequestType, UsageLogEntry};
    use chrono::{Duration, TimeZone};

    fn entry(tenant: &str, cost: f64, created_at: DateTime<Utc>) -> UsageLogEntry {
        UsageLogEntry {
            tenant_id: tenant.to_string(),
            item_id: None,
            request_type: RequestType::ItemGeneration,
            tokens_used: 0,
            cost_estimate: cost,
            processing_time_ms: 0,
            error: None,
            created_at,
        }
    }

    #[test]
    fn start_of_day_truncates_to_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 17, 45, 12).unwrap();
        assert_eq!(
            start_of_day(now),
            Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn denies_at_or_above_limit() {
        let store = Arc::new(MemoryStore::new());
        store.append_usage(entry("t1", 3.0, Utc::now())).await.unwrap();
        store.append_usage(entry("t1", 2.0, Utc::now())).await.unwrap();
        let governor = CostGovernor::new(store, 5.0);

        assert!(!governor.check_allowed("t1").await);
        assert!(governor.check_allowed("t2").await);
        assert!(matches!(
            governor.check("t1").await,
            Err(GenerationError::CostLimit { spent, .. }) if spent == 5.0
        ));
    }

    #[tokio::test]
    async fn yesterdays_spend_does_not_count() {
        let store = Arc::new(MemoryStore::new());
        let yesterday = start_of_day(Utc::now()) - Duration::minutes(1);
        store.append_usage(entry("t1", 100.0, yesterday)).await.unwrap();
        let governor = CostGovernor::new(store, 5.0);

        assert!(governor.check_allowed("t1").await);
    }

    #[tokio::test]
    async fn fails_open_when_ledger_unreadable() {
        let store = Arc::new(MemoryStore::new());
        store.append_usage(entry("t1", 100.0, Utc::now())).await.unwrap();
        store.set_fail_reads(true);
        let governor = CostGovernor::new(store, 5.0);

        assert!(governor.check_allowed("t1").await);
    }
}
