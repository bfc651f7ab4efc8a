//! Shared types for item generation.
//!
//! These types flow between the batch orchestrator, the per-item generator and
//! the store adapters, and make up the batch request/response wire format.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Languages content can be generated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "ro")]
    Romanian,
    #[serde(rename = "en")]
    English,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Romanian, Language::English];

    /// Two-letter code used on the wire and in store keys.
    pub fn code(self) -> &'static str {
        match self {
            Language::Romanian => "ro",
            Language::English => "en",
        }
    }

    /// Parse a language code, case-insensitively.
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(code))
    }

    /// English name, used when instructing the provider.
    pub fn display_name(self) -> &'static str {
        match self {
            Language::Romanian => "Romanian",
            Language::English => "English",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One line of a generated recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub ingredient_name: String,
    pub quantity: String,
}

impl RecipeLine {
    pub fn new(ingredient_name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            ingredient_name: ingredient_name.into(),
            quantity: quantity.into(),
        }
    }

    /// The same line with surrounding whitespace removed from both fields.
    pub fn trimmed(&self) -> Self {
        Self::new(self.ingredient_name.trim(), self.quantity.trim())
    }
}

/// Product-level nutrition estimate (per serving).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Nutrition {
    pub fn is_zero(&self) -> bool {
        self.calories == 0.0 && self.protein == 0.0 && self.carbs == 0.0 && self.fat == 0.0
    }
}

/// Input for generating content for a single item.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationInput {
    pub item_id: String,
    pub name: String,
    pub language_override: Option<Language>,
    pub tenant_id: String,
    /// Recipe already approved by the caller. When present, only the prose,
    /// nutrition and allergens are regenerated around it.
    pub approved_recipe: Option<Vec<RecipeLine>>,
}

impl GenerationInput {
    pub fn new(
        item_id: impl Into<String>,
        name: impl Into<String>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            language_override: None,
            tenant_id: tenant_id.into(),
            approved_recipe: None,
        }
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language_override = Some(language);
        self
    }

    pub fn with_approved_recipe(mut self, recipe: Vec<RecipeLine>) -> Self {
        self.approved_recipe = Some(recipe);
        self
    }

    pub fn guard_fields(&self) -> GuardFields {
        GuardFields {
            name: self.name.clone(),
            language_override: self.language_override,
        }
    }
}

/// Input attributes a cached result was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardFields {
    pub name: String,
    pub language_override: Option<Language>,
}

/// Generated content for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub item_id: String,
    pub language: Language,
    pub description: String,
    pub recipe: Vec<RecipeLine>,
    pub nutrition: Nutrition,
    pub allergen_codes: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl GenerationResult {
    /// The canonical empty result for items that need no generated content.
    pub fn empty(item_id: impl Into<String>, language: Language) -> Self {
        Self {
            item_id: item_id.into(),
            language,
            description: String::new(),
            recipe: Vec::new(),
            nutrition: Nutrition::default(),
            allergen_codes: Vec::new(),
            generated_at: Utc::now(),
        }
    }
}

/// A generation result as persisted, with the guard fields it was produced from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedRecord {
    pub tenant_id: String,
    pub result: GenerationResult,
    pub guard: GuardFields,
    /// Set when the item matched the exclusion filter and is empty on purpose.
    #[serde(default)]
    pub excluded: bool,
}

impl CachedRecord {
    /// A record is a valid hit only for identical guard fields, and only if it
    /// holds content (or is an intentional exclusion).
    pub fn is_hit_for(&self, guard: &GuardFields) -> bool {
        self.guard == *guard && (self.excluded || !self.result.description.trim().is_empty())
    }
}

/// Coarse bucket expressing ingredient-normalization match quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// Bucket a similarity score in `[0, 1]`.
    pub fn from_similarity(similarity: f64) -> Self {
        if similarity >= 0.9 {
            Self::High
        } else if similarity >= 0.7 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn is_acceptable(self) -> bool {
        self >= Self::Medium
    }
}

/// Per-100g nutrition for an ingredient, keyed by `(name, language)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub name: String,
    pub language: Language,
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,
    pub carbs_per_100g: f64,
    pub fat_per_100g: f64,
}

impl IngredientRecord {
    pub fn key(&self) -> (String, Language) {
        (ingredient_key(&self.name), self.language)
    }
}

/// Lookup key for ingredient names: trimmed and lowercased.
pub fn ingredient_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// What a usage-log entry was spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    ItemGeneration,
    IngredientMatch,
    IngredientNutrition,
}

/// One provider attempt. Entries are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLogEntry {
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub request_type: RequestType,
    pub tokens_used: u32,
    pub cost_estimate: f64,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-item processing stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CacheLookup,
    CostCheck,
    Filtered,
    Generating,
    Normalizing,
    NutritionEnhancing,
    AllergenMapping,
    Caching,
    Done,
}

/// How an item's record was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    Cached,
    Generated,
    Excluded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemError {
    pub kind: String,
    pub message: String,
    pub stage: Stage,
}

/// One record of a batch response. Every input id gets exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: String,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_confidence: Option<f32>,
    pub description: String,
    pub recipe: Vec<RecipeLine>,
    pub nutrition: Nutrition,
    pub allergens: Vec<String>,
    pub source: ItemSource,
    pub cost: f64,
    pub processing_time_ms: u64,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ItemError>,
}

impl ItemRecord {
    pub fn from_result(result: &GenerationResult, source: ItemSource) -> Self {
        Self {
            id: result.item_id.clone(),
            language: result.language,
            language_confidence: None,
            description: result.description.clone(),
            recipe: result.recipe.clone(),
            nutrition: result.nutrition,
            allergens: result.allergen_codes.clone(),
            source,
            cost: 0.0,
            processing_time_ms: 0,
            attempts: 0,
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, language: Language, error: ItemError) -> Self {
        Self {
            id: id.into(),
            language,
            language_confidence: None,
            description: String::new(),
            recipe: Vec::new(),
            nutrition: Nutrition::default(),
            allergens: Vec::new(),
            source: ItemSource::Failed,
            cost: 0.0,
            processing_time_ms: 0,
            attempts: 0,
            error: Some(error),
        }
    }
}

/// One requested item, as received from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_recipe: Option<Vec<RecipeLine>>,
}

impl BatchItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language_override: None,
            approved_recipe: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub tenant_id: String,
    pub items: Vec<BatchItem>,
    #[serde(default)]
    pub force_regeneration: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub cached_count: usize,
    pub generated_count: usize,
    pub excluded_count: usize,
    pub failed_count: usize,
    pub total_cost: f64,
    pub total_processing_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub items: Vec<ItemRecord>,
    pub summary: BatchSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached(description: &str, excluded: bool) -> CachedRecord {
        let mut result = GenerationResult::empty("item-1", Language::Romanian);
        result.description = description.to_string();
        CachedRecord {
            tenant_id: "t1".to_string(),
            result,
            guard: GuardFields {
                name: "Ciorbă de burtă".to_string(),
                language_override: None,
            },
            excluded,
        }
    }

    #[test]
    fn language_codes_parse_case_insensitively() {
        assert_eq!(Language::from_code("RO"), Some(Language::Romanian));
        assert_eq!(Language::from_code(" en "), Some(Language::English));
        assert_eq!(Language::from_code("fr"), None);
    }

    #[test]
    fn language_serializes_as_code() {
        let json = serde_json::to_string(&Language::English).unwrap();
        assert_eq!(json, "\"en\"");
    }

    #[test]
    fn renamed_item_is_not_a_hit() {
        let record = cached("Supă tradițională", false);
        let same = record.guard.clone();
        let renamed = GuardFields {
            name: "Ciorbă de perișoare".to_string(),
            language_override: None,
        };
        let overridden = GuardFields {
            language_override: Some(Language::English),
            ..same.clone()
        };

        assert!(record.is_hit_for(&same));
        assert!(!record.is_hit_for(&renamed));
        assert!(!record.is_hit_for(&overridden));
    }

    #[test]
    fn empty_description_is_only_a_hit_when_excluded() {
        let guard = cached("", false).guard.clone();
        assert!(!cached("  ", false).is_hit_for(&guard));
        assert!(cached("", true).is_hit_for(&guard));
    }

    #[test]
    fn confidence_tiers_order_and_parse() {
        assert!(ConfidenceTier::High > ConfidenceTier::Medium);
        assert!(ConfidenceTier::Medium.is_acceptable());
        assert!(!ConfidenceTier::Low.is_acceptable());
        assert_eq!(ConfidenceTier::parse("MEDIUM"), Some(ConfidenceTier::Medium));
        assert_eq!(ConfidenceTier::parse("certain"), None);
        assert_eq!(ConfidenceTier::from_similarity(0.75), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_similarity(0.95), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_similarity(0.2), ConfidenceTier::Low);
    }

    #[test]
    fn empty_result_is_all_zero() {
        let result = GenerationResult::empty("x", Language::English);
        assert!(result.description.is_empty());
        assert!(result.recipe.is_empty());
        assert!(result.nutrition.is_zero());
        assert!(result.allergen_codes.is_empty());
    }
}
