use thiserror::Error;

use crate::ai::ProviderError;
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Invalid batch input: {0}")]
    Validation(String),

    #[error("Daily cost limit reached for tenant {tenant_id}: spent {spent:.4} of {ceiling:.4}")]
    CostLimit {
        tenant_id: String,
        spent: f64,
        ceiling: f64,
    },

    #[error("Generation provider failed: {0}")]
    Provider(String),

    /// The provider refused the request in a way another attempt won't fix
    /// (bad credentials, missing configuration, a 4xx reply).
    #[error("Generation provider rejected the request: {0}")]
    ProviderRejected(String),

    #[error("Malformed generation reply: {0}")]
    Parse(String),

    #[error("Cache store failure: {0}")]
    Cache(String),
}

impl GenerationError {
    /// Transport and parse failures are worth another attempt; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Parse(_))
    }

    /// Stable tag used in item error records and usage-log entries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::CostLimit { .. } => "cost_limit_error",
            Self::Provider(_) | Self::ProviderRejected(_) => "provider_error",
            Self::Parse(_) => "parse_error",
            Self::Cache(_) => "cache_error",
        }
    }
}

impl From<ProviderError> for GenerationError {
    fn from(err: ProviderError) -> Self {
        if err.is_transient() {
            Self::Provider(err.to_string())
        } else {
            Self::ProviderRejected(err.to_string())
        }
    }
}

impl From<StoreError> for GenerationError {
    fn from(err: StoreError) -> Self {
        Self::Cache(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_provider_and_parse_are_retryable() {
        assert!(GenerationError::Provider("timeout".into()).is_retryable());
        assert!(GenerationError::Parse("bad json".into()).is_retryable());
        assert!(!GenerationError::Validation("empty".into()).is_retryable());
        assert!(!GenerationError::Cache("io".into()).is_retryable());
        assert!(!GenerationError::CostLimit {
            tenant_id: "t".into(),
            spent: 5.0,
            ceiling: 5.0,
        }
        .is_retryable());
    }

    #[test]
    fn rejected_provider_requests_are_final() {
        let auth: GenerationError = ProviderError::ApiError {
            status: 401,
            message: "invalid x-api-key".into(),
        }
        .into();
        assert!(matches!(auth, GenerationError::ProviderRejected(_)));
        assert!(!auth.is_retryable());
        assert_eq!(auth.kind(), "provider_error");

        let missing: GenerationError = ProviderError::NotConfigured("ANTHROPIC_API_KEY".into()).into();
        assert!(!missing.is_retryable());

        let overloaded: GenerationError = ProviderError::ApiError {
            status: 529,
            message: "overloaded".into(),
        }
        .into();
        assert!(overloaded.is_retryable());
    }

    #[test]
    fn cost_limit_message_names_tenant() {
        let err = GenerationError::CostLimit {
            tenant_id: "bistro-7".into(),
            spent: 5.5,
            ceiling: 5.0,
        };
        assert_eq!(err.kind(), "cost_limit_error");
        assert!(err.to_string().contains("bistro-7"));
    }
}
