//! Prompt templates.

pub mod ingredient_match;
pub mod ingredient_nutrition;
pub mod item_content;

pub use ingredient_match::{
    render_ingredient_match_prompt, render_ingredient_match_system_prompt,
    INGREDIENT_MATCH_PROMPT_NAME,
};
pub use ingredient_nutrition::{
    render_ingredient_nutrition_prompt, render_ingredient_nutrition_system_prompt,
    INGREDIENT_NUTRITION_PROMPT_NAME,
};
pub use item_content::{
    render_item_content_system_prompt, render_item_content_user_prompt, ITEM_CONTENT_PROMPT_NAME,
};
