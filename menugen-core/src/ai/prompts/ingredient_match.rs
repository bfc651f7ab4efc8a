//! Prompt for matching ingredient phrases against a tenant's existing vocabulary.

/// Prompt name for logs.
pub const INGREDIENT_MATCH_PROMPT_NAME: &str = "ingredient_match";

pub fn render_ingredient_match_system_prompt() -> String {
    r#"You are an ingredient matching assistant. For each candidate ingredient phrase, find the entry of the known vocabulary that names the same ingredient, ignoring spelling, word order, articles, plurals and language-specific inflection.

IMPORTANT: Only answer with entries copied exactly from the known vocabulary. Never invent entries. If nothing names the same ingredient, use null.

For each candidate return:
- "candidate": the candidate phrase, unchanged
- "match": the vocabulary entry or null
- "similarity": a number from 0 to 1
- "confidence": "high", "medium" or "low"

Respond with JSON only, no other text: {"matches": [{"candidate": "...", "match": "...", "similarity": 0.9, "confidence": "high"}]}"#
        .to_string()
}

pub fn render_ingredient_match_prompt(candidates: &[String], vocabulary: &[String]) -> String {
    format!(
        "Known vocabulary:\n{vocabulary}\n\nCandidates:\n{candidates}",
        vocabulary = bullet_list(vocabulary),
        candidates = bullet_list(candidates)
    )
}

fn bullet_list(entries: &[String]) -> String {
    entries
        .iter()
        .map(|e| format!("- {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
