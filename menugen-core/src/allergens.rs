//! Allergen mapping for generated recipes.
//!
//! Maps ingredient names flagged by the provider to allergen codes using the
//! static dictionary in `data/allergens.json`, loaded at compile time.

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use crate::types::Language;

/// Keywords this short must match a whole word ("ou" should not hit "soup").
const WHOLE_WORD_MAX_CHARS: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct AllergenDefinition {
    pub code: String,
    #[serde(rename = "names")]
    pub localized_names: HashMap<Language, String>,
    #[serde(rename = "keywords")]
    pub localized_keywords: HashMap<Language, Vec<String>>,
}

impl AllergenDefinition {
    pub fn name(&self, language: Language) -> Option<&str> {
        self.localized_names.get(&language).map(String::as_str)
    }

    fn matches(&self, lowered: &str, tokens: &[&str], language: Language) -> bool {
        let keywords = self
            .localized_keywords
            .get(&language)
            .into_iter()
            .flatten()
            .map(String::as_str);
        let names = self.localized_names.values().map(String::as_str);

        keywords.chain(names).any(|keyword| {
            let keyword = keyword.to_lowercase();
            if keyword.chars().count() <= WHOLE_WORD_MAX_CHARS {
                tokens.contains(&keyword.as_str())
            } else {
                lowered.contains(&keyword)
            }
        })
    }
}

#[derive(Deserialize)]
struct AllergensData {
    allergens: Vec<AllergenDefinition>,
}

static ALLERGENS: LazyLock<Vec<AllergenDefinition>> = LazyLock::new(|| {
    let json = include_str!("../../data/allergens.json");
    let data: AllergensData = serde_json::from_str(json).expect("Failed to parse allergens.json");
    data.allergens
});

/// All known allergen definitions.
pub fn definitions() -> &'static [AllergenDefinition] {
    &ALLERGENS
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllergenMapper;

impl AllergenMapper {
    pub fn new() -> Self {
        Self
    }

    /// Codes of every allergen whose localized name or keyword appears in one
    /// of `ingredients`. Sorted and deduplicated.
    pub fn map(&self, ingredients: &[String], language: Language) -> Vec<String> {
        let mut codes = BTreeSet::new();

        for ingredient in ingredients {
            let lowered = ingredient.to_lowercase();
            let tokens: Vec<&str> = lowered
                .split(|c: char| !c.is_alphanumeric())
                .filter(|t| !t.is_empty())
                .collect();

            for definition in definitions() {
                if definition.matches(&lowered, &tokens, language) {
                    codes.insert(definition.code.clone());
                }
            }
        }

        codes.into_iter().collect()
    }
}
