//! Generation client and the pieces around it: strict reply parsing and the
//! shared retry combinator.

mod client;
pub mod parse;
pub mod retry;

pub use client::{
    request_marker, GeneratedContent, GenerationClient, GenerationMode, GenerationSettings,
    Metered,
};
pub use parse::{IngredientNutrition, ItemContentReply, SemanticMatch};
pub use retry::{with_backoff, RetryOutcome, RetryPolicy};
