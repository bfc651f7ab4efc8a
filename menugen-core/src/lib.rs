//! Menu-item content generation.
//!
//! Augments catalog items with a generated description, a structured recipe,
//! a nutrition estimate and allergen codes. The entry point is
//! [`BatchOrchestrator`]; storage and the text-generation provider are
//! supplied by the caller as trait objects.

pub mod ai;
pub mod allergens;
pub mod batch;
pub mod cache;
pub mod config;
pub mod cost;
pub mod error;
pub mod exclusion;
pub mod fuzzy;
pub mod generation;
pub mod generator;
pub mod language;
pub mod normalize;
pub mod nutrition;
pub mod store;
pub mod types;
pub mod usage;

pub use ai::{create_provider, create_provider_from_env, FakeProvider, ProviderConfig, TextProvider};
pub use batch::BatchOrchestrator;
pub use config::GenerationConfig;
pub use cost::CostGovernor;
pub use error::GenerationError;
pub use generator::ItemGenerator;
pub use language::{Detection, LanguageDetector};
pub use store::{DiskStore, MemoryStore, StoreError, Stores};
pub use types::{
    BatchItem, BatchRequest, BatchResponse, BatchSummary, GenerationInput, GenerationResult,
    ItemRecord, ItemSource, Language, Nutrition, RecipeLine,
};
