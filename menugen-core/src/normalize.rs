//! Ingredient-name normalization against a tenant's existing vocabulary.
//!
//! Candidates are resolved in tiers:
//! 1. exact (case-insensitive) match against the vocabulary
//! 2. semantic match by the provider, accepted at `medium` confidence or above
//! 3. edit-distance fallback when the vocabulary is empty or the provider fails
//!
//! Anything left is registered as a new ingredient. Results are memoized per
//! tenant, language, candidate and vocabulary fingerprint, so normalizing the
//! same phrase against the same vocabulary always yields the same answer.
//! Only the latest vocabulary of each tenant and language is remembered.

use std::collections::HashMap;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::fuzzy;
use crate::generation::{GenerationClient, SemanticMatch};
use crate::types::{ingredient_key, ConfidenceTier, Language, RequestType};
use crate::usage::{Attempt, UsageLogger};

/// Default minimum similarity for the edit-distance tier.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Exact,
    Semantic,
    Fuzzy,
    New,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedIngredient {
    pub original: String,
    pub canonical: String,
    pub similarity: f64,
    pub confidence: ConfidenceTier,
    pub method: MatchMethod,
}

impl NormalizedIngredient {
    fn new_ingredient(original: &str, similarity: f64) -> Self {
        Self {
            original: original.to_string(),
            canonical: original.trim().to_string(),
            similarity,
            confidence: ConfidenceTier::Low,
            method: MatchMethod::New,
        }
    }
}

/// Normalized ingredients plus the cost of any provider calls made.
#[derive(Debug, Clone, Default)]
pub struct NormalizationOutcome {
    pub ingredients: Vec<NormalizedIngredient>,
    pub cost: f64,
}

/// Memoized results for one tenant and language, valid for one vocabulary.
#[derive(Debug, Default)]
struct MemoScope {
    fingerprint: String,
    entries: HashMap<String, NormalizedIngredient>,
}

/// Stable fingerprint of a vocabulary, independent of order and case.
pub fn vocabulary_fingerprint(vocabulary: &[String]) -> String {
    let mut keys: Vec<String> = vocabulary.iter().map(|v| ingredient_key(v)).collect();
    keys.sort();
    keys.dedup();

    let mut hasher = Sha256::new();
    for key in &keys {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[derive(Debug)]
pub struct IngredientNormalizer {
    client: GenerationClient,
    usage: UsageLogger,
    fuzzy_threshold: f64,
    memo: DashMap<(String, Language), MemoScope>,
}

impl IngredientNormalizer {
    pub fn new(client: GenerationClient, usage: UsageLogger, fuzzy_threshold: f64) -> Self {
        Self {
            client,
            usage,
            fuzzy_threshold,
            memo: DashMap::new(),
        }
    }

    /// Normalize `candidates` against `vocabulary`, in input order.
    pub async fn normalize(
        &self,
        tenant_id: &str,
        item_id: Option<&str>,
        language: Language,
        candidates: &[String],
        vocabulary: &[String],
    ) -> NormalizationOutcome {
        let fingerprint = vocabulary_fingerprint(vocabulary);

        // Resolve exact matches and memo hits; keep the rest for the provider.
        let by_key: HashMap<String, &String> =
            vocabulary.iter().map(|v| (ingredient_key(v), v)).collect();
        let mut resolved: HashMap<String, NormalizedIngredient> = HashMap::new();
        let mut pending: Vec<String> = Vec::new();

        for candidate in candidates {
            let key = ingredient_key(candidate);
            if resolved.contains_key(&key) || pending.iter().any(|p| ingredient_key(p) == key) {
                continue;
            }
            if let Some(hit) = self.memoized(tenant_id, language, &fingerprint, &key) {
                resolved.insert(key, hit);
            } else if let Some(entry) = by_key.get(&key) {
                resolved.insert(
                    key,
                    NormalizedIngredient {
                        original: candidate.clone(),
                        canonical: (*entry).clone(),
                        similarity: 1.0,
                        confidence: ConfidenceTier::High,
                        method: MatchMethod::Exact,
                    },
                );
            } else {
                pending.push(candidate.clone());
            }
        }

        let mut cost = 0.0;
        if !pending.is_empty() {
            let semantic = if vocabulary.is_empty() {
                None
            } else {
                let (matches, call_cost) = self
                    .semantic_matches(tenant_id, item_id, &pending, vocabulary)
                    .await;
                cost += call_cost;
                matches
            };

            for candidate in &pending {
                let normalized = match &semantic {
                    Some(matches) => self
                        .accept_semantic(candidate, matches, &by_key)
                        .unwrap_or_else(|| self.fuzzy_match(candidate, vocabulary)),
                    None => self.fuzzy_match(candidate, vocabulary),
                };
                tracing::debug!(
                    tenant_id,
                    candidate = %candidate,
                    canonical = %normalized.canonical,
                    method = ?normalized.method,
                    "Normalized ingredient"
                );
                self.remember(
                    tenant_id,
                    language,
                    &fingerprint,
                    ingredient_key(candidate),
                    normalized.clone(),
                );
                resolved.insert(ingredient_key(candidate), normalized);
            }
        }

        let ingredients = candidates
            .iter()
            .filter_map(|c| {
                resolved.get(&ingredient_key(c)).map(|n| NormalizedIngredient {
                    original: c.clone(),
                    ..n.clone()
                })
            })
            .collect();

        NormalizationOutcome { ingredients, cost }
    }

    fn memoized(
        &self,
        tenant_id: &str,
        language: Language,
        fingerprint: &str,
        key: &str,
    ) -> Option<NormalizedIngredient> {
        let scope = self.memo.get(&(tenant_id.to_string(), language))?;
        if scope.fingerprint != fingerprint {
            return None;
        }
        scope.entries.get(key).cloned()
    }

    fn remember(
        &self,
        tenant_id: &str,
        language: Language,
        fingerprint: &str,
        key: String,
        normalized: NormalizedIngredient,
    ) {
        let mut scope = self
            .memo
            .entry((tenant_id.to_string(), language))
            .or_default();
        if scope.fingerprint != fingerprint {
            // Entries for an older vocabulary can never be hit again.
            scope.fingerprint = fingerprint.to_string();
            scope.entries.clear();
        }
        scope.entries.insert(key, normalized);
    }

    /// Number of memoized results across all tenants and languages.
    pub fn memo_len(&self) -> usize {
        self.memo.iter().map(|scope| scope.entries.len()).sum()
    }

    /// One provider call for all pending candidates. `None` means the tier is unavailable.
    async fn semantic_matches(
        &self,
        tenant_id: &str,
        item_id: Option<&str>,
        pending: &[String],
        vocabulary: &[String],
    ) -> (Option<Vec<SemanticMatch>>, f64) {
        let started = Instant::now();
        let result = self.client.match_ingredients(pending, vocabulary).await;

        let cost = self
            .usage
            .record(Attempt {
                tenant_id,
                item_id,
                request_type: RequestType::IngredientMatch,
                elapsed: started.elapsed(),
                outcome: result.as_ref().map(|m| m.usage),
            })
            .await;

        match result {
            Ok(metered) => (Some(metered.value), cost),
            Err(e) => {
                tracing::warn!(tenant_id, error = %e, "Semantic matching failed, using fuzzy fallback");
                (None, cost)
            }
        }
    }

    /// Interpret the provider's verdict for one candidate.
    ///
    /// Returns `None` when the reply has no verdict for it, so the caller
    /// falls back to edit distance.
    fn accept_semantic(
        &self,
        candidate: &str,
        matches: &[SemanticMatch],
        by_key: &HashMap<String, &String>,
    ) -> Option<NormalizedIngredient> {
        let key = ingredient_key(candidate);
        let verdict = matches.iter().find(|m| ingredient_key(&m.candidate) == key)?;

        // Only entries actually in the vocabulary can be accepted.
        let entry = verdict
            .matched
            .as_deref()
            .and_then(|m| by_key.get(&ingredient_key(m)));

        match entry {
            Some(entry) if verdict.confidence.is_acceptable() => Some(NormalizedIngredient {
                original: candidate.to_string(),
                canonical: (*entry).clone(),
                similarity: verdict.similarity,
                confidence: verdict.confidence,
                method: MatchMethod::Semantic,
            }),
            _ => Some(NormalizedIngredient::new_ingredient(
                candidate,
                verdict.similarity,
            )),
        }
    }

    fn fuzzy_match(&self, candidate: &str, vocabulary: &[String]) -> NormalizedIngredient {
        match fuzzy::best_match(candidate, vocabulary) {
            Some((entry, score)) if score >= self.fuzzy_threshold => NormalizedIngredient {
                original: candidate.to_string(),
                canonical: entry.to_string(),
                similarity: score,
                confidence: ConfidenceTier::from_similarity(score),
                method: MatchMethod::Fuzzy,
            },
            Some((_, score)) => NormalizedIngredient::new_ingredient(candidate, score),
            None => NormalizedIngredient::new_ingredient(candidate, 0.0),
        }
    }
}
