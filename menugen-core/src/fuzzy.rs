//! String-similarity fallback for ingredient normalization.

/// Levenshtein distance over Unicode scalar values.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Normalized similarity in `[0, 1]`: `1 - distance / longer length`,
/// compared case-insensitively after trimming.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(&a, &b) as f64 / longest as f64
}

/// Best-scoring vocabulary entry for `candidate`. Ties keep the earliest entry.
pub fn best_match<'a>(candidate: &str, vocabulary: &'a [String]) -> Option<(&'a str, f64)> {
    vocabulary.iter().fold(None, |best, entry| {
        let score = similarity(candidate, entry);
        match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((entry.as_str(), score)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("brânză", "branza"), 2);
    }

    #[test]
    fn dropped_word_stays_above_threshold() {
        let score = similarity("piept pui", "Piept de pui");
        assert!((score - 0.75).abs() < 1e-9, "{}", score);
    }

    #[test]
    fn similarity_is_case_insensitive_and_symmetric() {
        assert_eq!(similarity("Usturoi", "usturoi"), 1.0);
        assert_eq!(similarity("ceapă", "ceapa"), similarity("ceapa", "ceapă"));
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn best_match_picks_highest_score() {
        let vocabulary = vec![
            "Smântână".to_string(),
            "Piept de pui".to_string(),
            "Pulpă de pui".to_string(),
        ];
        let (entry, score) = best_match("piept pui", &vocabulary).unwrap();
        assert_eq!(entry, "Piept de pui");
        assert!(score >= 0.7);
        assert!(best_match("x", &[]).is_none());
    }
}
