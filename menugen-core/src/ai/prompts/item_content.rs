//! Prompt for generating an item's description, recipe, nutrition and allergen candidates.

use crate::types::{Language, RecipeLine};

/// Prompt name for logs.
pub const ITEM_CONTENT_PROMPT_NAME: &str = "item_content";

/// Render the system prompt. `fixed_recipe` switches to description-only mode.
pub fn render_item_content_system_prompt(language: Language, fixed_recipe: bool) -> String {
    let recipe_rule = if fixed_recipe {
        "- The recipe is FIXED. Copy the given recipe into \"recipe\" exactly, same order, same names, same quantities. Base the description, nutrition and allergens on it."
    } else {
        "- Invent a plausible recipe: 3 to 12 ingredients with quantities for one serving."
    };

    format!(
        r#"You are a menu copywriter and nutrition assistant for restaurants. Given a menu item name, write content for the menu in {language}.

RULES:
- Write the description and ingredient names in {language}.
- The description is 1 to 3 appetizing sentences. No prices, no emojis.
{recipe_rule}
- Nutrition is an estimate for one serving: calories in kcal, protein, carbs and fat in grams.
- "allergen_ingredients" lists the recipe ingredients that contain common allergens (gluten, milk, eggs, nuts, fish, shellfish, soy, celery, mustard, sesame, sulphites, lupin, molluscs, peanuts). Use an empty list if none.
- Return ONLY valid JSON matching the schema below. No other text.

JSON Schema:
{{
  "description": "string",
  "recipe": [{{"ingredient_name": "string", "quantity": "string"}}],
  "nutrition": {{"calories": number, "protein": number, "carbs": number, "fat": number}},
  "allergen_ingredients": ["string"]
}}"#,
        language = language.display_name(),
        recipe_rule = recipe_rule
    )
}

/// Render the user message. `request_marker` must differ on every call so the
/// provider never answers a repeated prompt from its own cache.
pub fn render_item_content_user_prompt(
    name: &str,
    fixed_recipe: Option<&[RecipeLine]>,
    request_marker: &str,
) -> String {
    let mut prompt = format!("Menu item: {name}\n");

    if let Some(recipe) = fixed_recipe {
        let lines = recipe
            .iter()
            .map(|line| format!("- {} | {}", line.ingredient_name, line.quantity))
            .collect::<Vec<_>>()
            .join("\n");
        prompt.push_str(&format!("\nFixed recipe (ingredient | quantity):\n{lines}\n"));
    }

    prompt.push_str(&format!("\nRequest-ID: {request_marker}"));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_full_prompt() {
        let system = render_item_content_system_prompt(Language::Romanian, false);
        let user = render_item_content_user_prompt("Ciorbă de burtă", None, "123-abc");

        assert!(system.contains("Romanian"));
        assert!(system.contains("Invent a plausible recipe"));
        assert!(user.contains("Ciorbă de burtă"));
        assert!(user.contains("Request-ID: 123-abc"));
        assert!(!user.contains("Fixed recipe"));
    }

    #[test]
    fn test_render_description_only_prompt() {
        let recipe = vec![
            RecipeLine::new("Chicken breast", "150 g"),
            RecipeLine::new("Rice", "100 g"),
        ];
        let system = render_item_content_system_prompt(Language::English, true);
        let user = render_item_content_user_prompt("Chicken & rice", Some(&recipe), "m");

        assert!(system.contains("The recipe is FIXED"));
        assert!(user.contains("- Chicken breast | 150 g"));
        assert!(user.contains("- Rice | 100 g"));
    }
}
