//! Language detection for menu item names.
//!
//! Each supported language has a fixed vocabulary of cues. Every cue category
//! adds a capped increment to that language's score; the higher score wins.

use serde::Serialize;

use crate::types::Language;

/// Confidence reported when falling back to the default language.
pub const FALLBACK_CONFIDENCE: f32 = 0.2;

/// Confidence reported for names too short to judge.
pub const SHORT_NAME_CONFIDENCE: f32 = 0.1;

/// Scores below this are treated as "no signal".
const NEAR_ZERO: f32 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub language: Language,
    pub confidence: f32,
    pub reasons: Vec<String>,
}

/// A category of cues with its per-hit increment and cap.
struct CueCategory {
    name: &'static str,
    per_hit: f32,
    cap: f32,
    kind: CueKind,
}

enum CueKind {
    /// Characters counted anywhere in the name.
    Chars(&'static [char]),
    /// Substrings counted anywhere in the lowercased name.
    Patterns(&'static [&'static str]),
    /// Whole words, or word prefixes for inflected forms.
    Words(&'static [&'static str]),
}

const ROMANIAN: &[CueCategory] = &[
    CueCategory {
        name: "diacritics",
        per_hit: 0.15,
        cap: 0.45,
        kind: CueKind::Chars(&['ă', 'â', 'î', 'ș', 'ş', 'ț', 'ţ']),
    },
    CueCategory {
        name: "letter_patterns",
        per_hit: 0.1,
        cap: 0.2,
        kind: CueKind::Patterns(&["ii ", "ție", "tie ", "ului", "elor", "ilor", "ea ", "oa", "ce ", "ci "]),
    },
    CueCategory {
        name: "food_words",
        per_hit: 0.2,
        cap: 0.4,
        kind: CueKind::Words(&[
            "ciorb", "supă", "supa", "pui", "porc", "vită", "vita", "miel", "pește", "peste",
            "cartof", "brânz", "branz", "smântân", "smantan", "mămălig", "mamalig", "sarmal",
            "mici", "ceafă", "ceafa", "piept", "ciuperc", "legum", "salată", "salata", "orez",
            "ou", "ouă", "papanaș", "papanas", "clătit", "clatit", "plăcint", "placint", "usturoi",
            "ceap", "roșii", "rosii", "ardei", "varză", "varza", "fasole", "burtă", "burta",
            "friptur", "tochitur", "cârnați", "carnati", "pâine", "paine",
        ]),
    },
    CueCategory {
        name: "cooking_methods",
        per_hit: 0.2,
        cap: 0.3,
        kind: CueKind::Words(&[
            "prăjit", "prajit", "fiert", "copt", "grătar", "gratar", "afumat", "marinat",
            "înăbușit", "inabusit", "gratinat", "pane", "rumenit", "tocan", "ceaun",
        ]),
    },
    CueCategory {
        name: "descriptors",
        per_hit: 0.1,
        cap: 0.2,
        kind: CueKind::Words(&[
            "proaspăt", "proaspat", "picant", "dulce", "acru", "casei", "tradițional",
            "traditional", "țărănesc", "taranesc", "bunicii", "crocant", "cremos",
        ]),
    },
    CueCategory {
        name: "function_words",
        per_hit: 0.15,
        cap: 0.3,
        kind: CueKind::Words(&["de", "cu", "și", "si", "la", "din", "în", "pe", "fără", "fara"]),
    },
];

const ENGLISH: &[CueCategory] = &[
    CueCategory {
        name: "letter_patterns",
        per_hit: 0.1,
        cap: 0.2,
        kind: CueKind::Patterns(&["th", "ing", "ed ", "ck", "sh", "wh", "ee", "oo"]),
    },
    CueCategory {
        name: "food_words",
        per_hit: 0.2,
        cap: 0.4,
        kind: CueKind::Words(&[
            "chicken", "beef", "pork", "lamb", "fish", "salmon", "soup", "salad", "burger",
            "steak", "fries", "potato", "cheese", "bread", "egg", "rice", "pasta", "sauce",
            "mushroom", "bacon", "sandwich", "wings", "pancake", "cake", "pie", "shrimp",
            "vegetable", "beans", "onion", "garlic", "tomato",
        ]),
    },
    CueCategory {
        name: "cooking_methods",
        per_hit: 0.2,
        cap: 0.3,
        kind: CueKind::Words(&[
            "fried", "grilled", "baked", "roasted", "smoked", "boiled", "steamed", "braised",
            "sauteed", "stewed", "crispy", "marinated", "breaded",
        ]),
    },
    CueCategory {
        name: "descriptors",
        per_hit: 0.1,
        cap: 0.2,
        kind: CueKind::Words(&[
            "fresh", "spicy", "sweet", "sour", "homemade", "classic", "traditional", "creamy",
            "house", "special", "hot",
        ]),
    },
    CueCategory {
        name: "function_words",
        per_hit: 0.15,
        cap: 0.3,
        kind: CueKind::Words(&["with", "and", "of", "the", "in", "on", "without"]),
    },
];

fn cues_for(language: Language) -> &'static [CueCategory] {
    match language {
        Language::Romanian => ROMANIAN,
        Language::English => ENGLISH,
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Short cues match whole words only; longer ones also match as word prefixes
/// so inflected forms ("ciorbă" / "ciorba" / "ciorbei") still count.
fn word_matches(token: &str, cue: &str) -> bool {
    token == cue || (cue.chars().count() >= 4 && token.starts_with(cue))
}

fn count_hits(kind: &CueKind, lowered: &str, tokens: &[&str]) -> usize {
    match kind {
        CueKind::Chars(chars) => lowered.chars().filter(|c| chars.contains(c)).count(),
        CueKind::Patterns(patterns) => {
            // Pad so word-boundary patterns ("ed ") also match at the end.
            let padded = format!("{} ", lowered);
            patterns.iter().filter(|p| padded.contains(*p)).count()
        }
        CueKind::Words(words) => tokens
            .iter()
            .filter(|t| words.iter().any(|w| word_matches(t, w)))
            .count(),
    }
}

fn score(language: Language, lowered: &str, tokens: &[&str], reasons: &mut Vec<String>) -> f32 {
    let mut total = 0.0;
    for category in cues_for(language) {
        let hits = count_hits(&category.kind, lowered, tokens);
        if hits > 0 {
            total += (hits as f32 * category.per_hit).min(category.cap);
            reasons.push(format!("{}:{}({})", language.code(), category.name, hits));
        }
    }
    total
}

#[derive(Debug, Clone)]
pub struct LanguageDetector {
    default_language: Language,
}

impl LanguageDetector {
    pub fn new(default_language: Language) -> Self {
        Self { default_language }
    }

    pub fn default_language(&self) -> Language {
        self.default_language
    }

    /// Detect the language of an item name.
    pub fn detect(&self, name: &str) -> Detection {
        let name = name.trim();
        if name.chars().count() < 2 {
            return Detection {
                language: self.default_language,
                confidence: SHORT_NAME_CONFIDENCE,
                reasons: vec!["name too short".to_string()],
            };
        }

        let lowered = name.to_lowercase();
        let tokens = tokenize(&lowered);
        let mut reasons = Vec::new();

        let ro = score(Language::Romanian, &lowered, &tokens, &mut reasons);
        let en = score(Language::English, &lowered, &tokens, &mut reasons);

        let (winner, best, other) = if ro > en {
            (Language::Romanian, ro, en)
        } else {
            (Language::English, en, ro)
        };

        if best < NEAR_ZERO || (ro - en).abs() < f32::EPSILON {
            reasons.push(format!("no clear signal, using default {}", self.default_language));
            return Detection {
                language: self.default_language,
                confidence: FALLBACK_CONFIDENCE,
                reasons,
            };
        }

        // Strength of the winning signal, discounted by how close the runner-up came.
        let margin = (best - other) / best;
        let confidence = (best.min(1.0) * (0.5 + 0.5 * margin)).clamp(0.0, 1.0);

        Detection {
            language: winner,
            confidence,
            reasons,
        }
    }

    /// Resolve the language for an item: an override always wins.
    pub fn resolve(&self, name: &str, language_override: Option<Language>) -> Detection {
        match language_override {
            Some(language) => Detection {
                language,
                confidence: 1.0,
                reasons: vec!["manual override".to_string()],
            },
            None => self.detect(name),
        }
    }
}

impl Default for LanguageDetector {
    fn default() -> Self {
        Self::new(Language::Romanian)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diacritic_rich_name_is_romanian() {
        let detection = LanguageDetector::default().detect("Mămăligă cu brânză și smântână");
        assert_eq!(detection.language, Language::Romanian);
        assert!(detection.confidence > 0.5, "{:?}", detection);
        assert!(detection
            .reasons
            .iter()
            .any(|r| r.starts_with("ro:diacritics")));
    }

    #[test]
    fn english_dish_is_english() {
        let detection =
            LanguageDetector::new(Language::Romanian).detect("Grilled chicken with fresh salad");
        assert_eq!(detection.language, Language::English);
        assert!(detection.confidence > 0.5, "{:?}", detection);
    }

    #[test]
    fn unaccented_romanian_still_detected() {
        let detection = LanguageDetector::new(Language::English).detect("Ciorba de burta");
        assert_eq!(detection.language, Language::Romanian);
    }

    #[test]
    fn short_name_falls_back_with_low_confidence() {
        let detection = LanguageDetector::new(Language::English).detect("X");
        assert_eq!(detection.language, Language::English);
        assert_eq!(detection.confidence, SHORT_NAME_CONFIDENCE);
    }

    #[test]
    fn no_signal_falls_back_to_default() {
        let detection = LanguageDetector::new(Language::Romanian).detect("Xyz 42");
        assert_eq!(detection.language, Language::Romanian);
        assert_eq!(detection.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn override_always_wins() {
        let detector = LanguageDetector::default();
        let detection = detector.resolve("Mămăligă cu brânză și smântână", Some(Language::English));
        assert_eq!(detection.language, Language::English);
        assert_eq!(detection.confidence, 1.0);
    }

    #[test]
    fn confidence_is_bounded() {
        let detector = LanguageDetector::default();
        for name in [
            "Ciorbă de burtă cu smântână și ardei iute, rețeta bunicii",
            "Fresh crispy fried chicken wings with garlic sauce and fries",
            "Pizza",
        ] {
            let d = detector.detect(name);
            assert!((0.0..=1.0).contains(&d.confidence), "{}: {:?}", name, d);
        }
    }
}
