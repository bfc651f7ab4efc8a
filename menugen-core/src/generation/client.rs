//! Generation client: builds prompts, calls the provider, parses replies.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::parse::{
    parse_ingredient_matches, parse_ingredient_nutrition, parse_item_content,
    IngredientNutrition, SemanticMatch,
};
use crate::ai::prompts::{
    render_ingredient_match_prompt, render_ingredient_match_system_prompt,
    render_ingredient_nutrition_prompt, render_ingredient_nutrition_system_prompt,
    render_item_content_system_prompt, render_item_content_user_prompt,
    INGREDIENT_MATCH_PROMPT_NAME, INGREDIENT_NUTRITION_PROMPT_NAME, ITEM_CONTENT_PROMPT_NAME,
};
use crate::ai::{CompletionRequest, TextProvider, TokenUsage};
use crate::error::GenerationError;
use crate::types::{Language, Nutrition, RecipeLine};

/// What the provider is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Description, recipe, nutrition and allergen candidates from scratch.
    Full,
    /// Keep an approved recipe verbatim; regenerate everything else around it.
    DescriptionOnly,
}

/// Sampling settings applied to every request.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Model override; `None` uses the provider's model.
    pub model: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.7,
            max_output_tokens: 1500,
        }
    }
}

/// Content produced for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedContent {
    pub description: String,
    pub recipe: Vec<RecipeLine>,
    pub nutrition: Nutrition,
    pub allergen_candidates: Vec<String>,
    pub usage: TokenUsage,
}

/// A parsed reply together with what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Metered<T> {
    pub value: T,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone)]
pub struct GenerationClient {
    provider: Arc<dyn TextProvider>,
    settings: GenerationSettings,
}

/// A marker unique to this request: millisecond timestamp plus a random token.
pub fn request_marker() -> String {
    format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        Uuid::new_v4().simple()
    )
}

impl GenerationClient {
    pub fn new(provider: Arc<dyn TextProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider(&self) -> &Arc<dyn TextProvider> {
        &self.provider
    }

    fn request(&self, system: String, user: String, temperature: f32) -> CompletionRequest {
        CompletionRequest {
            system,
            user,
            model: self.settings.model.clone(),
            temperature: Some(temperature),
            max_output_tokens: Some(self.settings.max_output_tokens),
            json_response: true,
        }
    }

    /// Generate content for an item name.
    ///
    /// In `DescriptionOnly` mode `existing_recipe` is required and the returned
    /// recipe is exactly that recipe; a reply that alters it is rejected as a
    /// parse error.
    pub async fn generate(
        &self,
        name: &str,
        language: Language,
        mode: GenerationMode,
        existing_recipe: Option<&[RecipeLine]>,
    ) -> Result<GeneratedContent, GenerationError> {
        let fixed_recipe = match (mode, existing_recipe) {
            (GenerationMode::Full, _) => None,
            (GenerationMode::DescriptionOnly, Some(recipe)) if !recipe.is_empty() => Some(recipe),
            (GenerationMode::DescriptionOnly, _) => {
                return Err(GenerationError::Validation(
                    "description_only mode needs a non-empty recipe".to_string(),
                ))
            }
        };

        let system = render_item_content_system_prompt(language, fixed_recipe.is_some());
        let user = render_item_content_user_prompt(name, fixed_recipe, &request_marker());
        let request = self.request(system, user, self.settings.temperature);

        let response = self
            .provider
            .complete(ITEM_CONTENT_PROMPT_NAME, request)
            .await?;
        let reply = parse_item_content(&response.content)?;

        let recipe = match fixed_recipe {
            None => {
                if reply.recipe.is_empty() {
                    return Err(GenerationError::Parse("Reply has no recipe".to_string()));
                }
                reply.recipe
            }
            Some(fixed) => {
                let fixed: Vec<RecipeLine> = fixed.iter().map(RecipeLine::trimmed).collect();
                if !reply.recipe.is_empty() && reply.recipe != fixed {
                    return Err(GenerationError::Parse(
                        "Reply altered the fixed recipe".to_string(),
                    ));
                }
                fixed
            }
        };

        Ok(GeneratedContent {
            description: reply.description,
            recipe,
            nutrition: reply.nutrition,
            allergen_candidates: reply.allergen_ingredients,
            usage: response.usage,
        })
    }

    /// Ask the provider which vocabulary entry each candidate phrase names.
    pub async fn match_ingredients(
        &self,
        candidates: &[String],
        vocabulary: &[String],
    ) -> Result<Metered<Vec<SemanticMatch>>, GenerationError> {
        let request = self.request(
            render_ingredient_match_system_prompt(),
            render_ingredient_match_prompt(candidates, vocabulary),
            0.0,
        );

        let response = self
            .provider
            .complete(INGREDIENT_MATCH_PROMPT_NAME, request)
            .await?;

        Ok(Metered {
            value: parse_ingredient_matches(&response.content)?,
            usage: response.usage,
        })
    }

    /// Ask the provider for per-100g nutrition of one ingredient.
    pub async fn ingredient_nutrition(
        &self,
        ingredient: &str,
        language: Language,
    ) -> Result<Metered<IngredientNutrition>, GenerationError> {
        let request = self.request(
            render_ingredient_nutrition_system_prompt(),
            render_ingredient_nutrition_prompt(ingredient, language),
            0.0,
        );

        let response = self
            .provider
            .complete(INGREDIENT_NUTRITION_PROMPT_NAME, request)
            .await?;

        Ok(Metered {
            value: parse_ingredient_nutrition(&response.content)?,
            usage: response.usage,
        })
    }
}
