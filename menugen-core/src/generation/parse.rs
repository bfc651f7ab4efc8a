//! Strict parsing of provider replies.
//!
//! Every reply goes through one function per reply kind, returning either the
//! parsed value or `GenerationError::Parse`. Default rules:
//! - surrounding whitespace and a single Markdown code fence are stripped
//! - `recipe` and `allergen_ingredients` default to empty lists
//! - a recipe `quantity` may be a string or a number and defaults to ""
//! - nutrition values are required, finite and non-negative
//! - every other missing or mistyped field is a parse error

use serde::Deserialize;

use crate::error::GenerationError;
use crate::types::{ConfidenceTier, Nutrition, RecipeLine};

/// Parsed item-content reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemContentReply {
    pub description: String,
    pub recipe: Vec<RecipeLine>,
    pub nutrition: Nutrition,
    pub allergen_ingredients: Vec<String>,
}

/// One semantic-match verdict for a candidate phrase.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMatch {
    pub candidate: String,
    pub matched: Option<String>,
    pub similarity: f64,
    pub confidence: ConfidenceTier,
}

/// Per-100g nutrition for one ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct IngredientNutrition {
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,
    pub carbs_per_100g: f64,
    pub fat_per_100g: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Quantity {
    Text(String),
    Number(f64),
}

impl Default for Quantity {
    fn default() -> Self {
        Quantity::Text(String::new())
    }
}

impl Quantity {
    fn into_text(self) -> String {
        match self {
            Quantity::Text(s) => s.trim().to_string(),
            Quantity::Number(n) => format_number(n),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRecipeLine {
    ingredient_name: String,
    #[serde(default)]
    quantity: Quantity,
}

#[derive(Debug, Deserialize)]
struct RawNutrition {
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
}

#[derive(Debug, Deserialize)]
struct RawItemContent {
    description: String,
    #[serde(default)]
    recipe: Vec<RawRecipeLine>,
    nutrition: RawNutrition,
    #[serde(default)]
    allergen_ingredients: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    candidate: String,
    #[serde(rename = "match")]
    matched: Option<String>,
    #[serde(default)]
    similarity: f64,
    confidence: String,
}

#[derive(Debug, Deserialize)]
struct RawMatches {
    matches: Vec<RawMatch>,
}

/// Remove surrounding whitespace and one Markdown code fence, if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse_json<'a, T: Deserialize<'a>>(text: &'a str, what: &str) -> Result<T, GenerationError> {
    serde_json::from_str(strip_code_fence(text))
        .map_err(|e| GenerationError::Parse(format!("Invalid {} JSON: {}", what, e)))
}

fn check_amount(name: &str, value: f64) -> Result<f64, GenerationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(GenerationError::Parse(format!(
            "{} must be a non-negative number, got {}",
            name, value
        )))
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parse an item-content reply.
pub fn parse_item_content(text: &str) -> Result<ItemContentReply, GenerationError> {
    let raw: RawItemContent = parse_json(text, "item content")?;

    let description = raw.description.trim().to_string();
    if description.is_empty() {
        return Err(GenerationError::Parse("Empty description".to_string()));
    }

    let recipe = raw
        .recipe
        .into_iter()
        .map(|line| {
            let name = line.ingredient_name.trim().to_string();
            if name.is_empty() {
                return Err(GenerationError::Parse(
                    "Recipe line with empty ingredient_name".to_string(),
                ));
            }
            Ok(RecipeLine::new(name, line.quantity.into_text()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let nutrition = Nutrition {
        calories: check_amount("calories", raw.nutrition.calories)?,
        protein: check_amount("protein", raw.nutrition.protein)?,
        carbs: check_amount("carbs", raw.nutrition.carbs)?,
        fat: check_amount("fat", raw.nutrition.fat)?,
    };

    let allergen_ingredients = raw
        .allergen_ingredients
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();

    Ok(ItemContentReply {
        description,
        recipe,
        nutrition,
        allergen_ingredients,
    })
}

/// Parse an ingredient-match reply.
pub fn parse_ingredient_matches(text: &str) -> Result<Vec<SemanticMatch>, GenerationError> {
    let raw: RawMatches = parse_json(text, "ingredient match")?;

    raw.matches
        .into_iter()
        .map(|m| {
            let confidence = ConfidenceTier::parse(&m.confidence).ok_or_else(|| {
                GenerationError::Parse(format!("Unknown confidence tier: {}", m.confidence))
            })?;
            let similarity = check_amount("similarity", m.similarity)?.min(1.0);
            Ok(SemanticMatch {
                candidate: m.candidate.trim().to_string(),
                matched: m
                    .matched
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
                similarity,
                confidence,
            })
        })
        .collect()
}

/// Parse an ingredient-nutrition reply.
pub fn parse_ingredient_nutrition(text: &str) -> Result<IngredientNutrition, GenerationError> {
    let raw: IngredientNutrition = parse_json(text, "ingredient nutrition")?;
    Ok(IngredientNutrition {
        calories_per_100g: check_amount("calories_per_100g", raw.calories_per_100g)?,
        protein_per_100g: check_amount("protein_per_100g", raw.protein_per_100g)?,
        carbs_per_100g: check_amount("carbs_per_100g", raw.carbs_per_100g)?,
        fat_per_100g: check_amount("fat_per_100g", raw.fat_per_100g)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"{
        "description": "  A hearty sour soup.  ",
        "recipe": [
            {"ingredient_name": "Tripe", "quantity": "200 g"},
            {"ingredient_name": "Sour cream", "quantity": 50},
            {"ingredient_name": "Garlic"}
        ],
        "nutrition": {"calories": 420, "protein": 28.5, "carbs": 12, "fat": 27},
        "allergen_ingredients": ["Sour cream", " "]
    }"#;

    #[test]
    fn parses_full_reply_with_defaults() {
        let reply = parse_item_content(REPLY).unwrap();

        assert_eq!(reply.description, "A hearty sour soup.");
        assert_eq!(
            reply.recipe,
            vec![
                RecipeLine::new("Tripe", "200 g"),
                RecipeLine::new("Sour cream", "50"),
                RecipeLine::new("Garlic", ""),
            ]
        );
        assert_eq!(reply.nutrition.protein, 28.5);
        assert_eq!(reply.allergen_ingredients, vec!["Sour cream".to_string()]);
    }

    #[test]
    fn strips_code_fence() {
        let fenced = format!("```json\n{}\n```", REPLY);
        assert!(parse_item_content(&fenced).is_ok());
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {} "), "{}");
    }

    #[test]
    fn rejects_prose_and_missing_fields() {
        assert!(matches!(
            parse_item_content("Sure! Here is your content."),
            Err(GenerationError::Parse(_))
        ));
        assert!(matches!(
            parse_item_content(r#"{"description": "x"}"#),
            Err(GenerationError::Parse(_))
        ));
        assert!(matches!(
            parse_item_content(
                r#"{"description": " ", "nutrition": {"calories": 1, "protein": 1, "carbs": 1, "fat": 1}}"#
            ),
            Err(GenerationError::Parse(_))
        ));
    }

    #[test]
    fn rejects_negative_nutrition() {
        let reply = r#"{"description": "x", "nutrition": {"calories": -5, "protein": 1, "carbs": 1, "fat": 1}}"#;
        assert!(parse_item_content(reply).is_err());
    }

    #[test]
    fn parses_matches() {
        let reply = r#"{"matches": [
            {"candidate": "piept pui", "match": "Piept de pui", "similarity": 0.93, "confidence": "High"},
            {"candidate": "Quinoa", "match": null, "similarity": 0, "confidence": "low"}
        ]}"#;
        let matches = parse_ingredient_matches(reply).unwrap();

        assert_eq!(matches[0].matched.as_deref(), Some("Piept de pui"));
        assert_eq!(matches[0].confidence, ConfidenceTier::High);
        assert_eq!(matches[1].matched, None);
        assert_eq!(matches[1].confidence, ConfidenceTier::Low);
    }

    #[test]
    fn rejects_unknown_confidence() {
        let reply = r#"{"matches": [{"candidate": "a", "match": "b", "similarity": 1, "confidence": "sure"}]}"#;
        assert!(parse_ingredient_matches(reply).is_err());
    }

    #[test]
    fn parses_ingredient_nutrition() {
        let reply = r#"{"calories_per_100g": 165, "protein_per_100g": 31, "carbs_per_100g": 0, "fat_per_100g": 3.6}"#;
        let n = parse_ingredient_nutrition(reply).unwrap();
        assert_eq!(n.calories_per_100g, 165.0);
        assert_eq!(n.fat_per_100g, 3.6);
    }
}
