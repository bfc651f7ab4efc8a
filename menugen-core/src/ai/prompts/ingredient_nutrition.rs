//! Prompt for per-100g nutrition of a single ingredient.

use crate::types::Language;

/// Prompt name for logs.
pub const INGREDIENT_NUTRITION_PROMPT_NAME: &str = "ingredient_nutrition";

pub fn render_ingredient_nutrition_system_prompt() -> String {
    r#"You are a nutrition database assistant. Estimate typical nutrition values per 100 g of the raw ingredient.

Respond with JSON only, no other text: {"calories_per_100g": number, "protein_per_100g": number, "carbs_per_100g": number, "fat_per_100g": number}"#
        .to_string()
}

pub fn render_ingredient_nutrition_prompt(ingredient: &str, language: Language) -> String {
    format!(
        "Ingredient ({language}): {ingredient}",
        language = language.display_name(),
        ingredient = ingredient
    )
}
