//! Exclusion filter for items that need no generated content.
//!
//! Packaged drinks and other resold products get the canonical empty result
//! instead of a provider call.
//!
//! Brand and packaging tokens exclude on their own. Drink words only exclude
//! when the drink is the item itself: the word opens the name, or closes it
//! without a linking word before it ("Fresh orange juice"), and nothing in
//! the name marks a dish. "Pui în sos de vin" and "Tort de cafea" are dishes
//! that mention a drink and still get generated content.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionCategory {
    Brand,
    Beverage,
    Packaging,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusionMatch {
    pub category: ExclusionCategory,
    pub matched: String,
}

static BRAND_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"coca[\s-]?cola",
        r"pepsi",
        r"fanta",
        r"sprite",
        r"schweppes",
        r"mirinda",
        r"7\s?up",
        r"evervess",
        r"red\s?bull",
        r"monster",
        r"lipton",
        r"nestea",
        r"cappy",
        r"prigat",
        r"tymbark",
        r"borsec",
        r"dorna",
        r"aqua\s+carpatica",
        r"perla\s+harghitei",
        r"heineken",
        r"ursus",
        r"timi[sș]oreana",
        r"ciuc",
        r"bergenbier",
        r"stella\s+artois",
        r"tuborg",
        r"carlsberg",
        r"peroni",
        r"corona\s+extra",
        r"jack\s+daniel'?s",
        r"johnnie\s+walker",
        r"jameson",
        r"absolut",
        r"finlandia",
        r"bacardi",
        r"aperol",
        r"martini",
        r"j[aä]germeister",
        r"nescaf[eé]",
    ])
});

static BEVERAGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"bere",
        r"beer",
        r"vin",
        r"wine",
        r"vodka",
        r"whiske?y",
        r"gin",
        r"tequila",
        r"lichior",
        r"liqueur",
        r"prosecco",
        r"[sș]ampanie",
        r"champagne",
        r"cidru",
        r"cider",
        r"p[aă]linc[aă]",
        r"[tț]uic[aă]",
        r"ap[aă]\s+(mineral[aă]|plat[aă]|tonic[aă]|carbogazoas[aă])",
        r"(mineral|sparkling|still|tonic)\s+water",
        r"suc",
        r"juice",
        r"soda",
        r"limonad[aă]",
        r"lemonade",
        r"energizant",
        r"energy\s+drink",
        r"cola",
        r"espresso",
        r"cafea",
        r"coffee",
        r"cappuccino",
        r"latte",
        r"ceai",
        r"tea",
    ])
});

/// Words that make a name a dish even when it mentions a drink.
static DISH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"pui",
        r"porc",
        r"vit[aă]",
        r"vi[tț]el",
        r"miel",
        r"ra[tț][aă]",
        r"curcan",
        r"ciolan",
        r"coaste",
        r"ceaf[aă]",
        r"piept",
        r"cotlet",
        r"friptur[aă]",
        r"tochitur[aă]",
        r"tocan[aă]",
        r"pe[sș]te",
        r"somon",
        r"p[aă]str[aă]v",
        r"creve[tț]i",
        r"midii",
        r"sos",
        r"ciorb[aă]",
        r"sup[aă]",
        r"tort",
        r"pr[aă]jitur[aă]",
        r"cl[aă]tite",
        r"[iî]nghe[tț]at[aă]",
        r"tiramisu",
        r"chicken",
        r"pork",
        r"beef",
        r"lamb",
        r"duck",
        r"fish",
        r"salmon",
        r"shrimps?",
        r"mussels",
        r"chips",
        r"fries",
        r"steak",
        r"ribs",
        r"stew",
        r"soup",
        r"sauce",
        r"battered",
        r"glazed",
        r"braised",
        r"cake",
        r"pie",
        r"ice\s+cream",
        r"coq",
    ])
});

/// Linking words that make a trailing drink word an ingredient ("... la bere").
const LINKING_WORDS: &[&str] = &[
    "de", "la", "cu", "în", "in", "din", "pe", "au", "à", "a", "with", "and", "of",
];

static PACKAGING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\d+(?:[.,]\d+)?\s?(?:ml|cl|l|ltr|litri|litru|liter|litre)\b")
            .expect("Invalid volume regex"),
        Regex::new(r"(?i)\b(?:sticl[aă]|doz[aă]|cutie|pet|bottle|can|canned)\b")
            .expect("Invalid container regex"),
    ]
});

/// Compile whole-word, case-insensitive patterns.
fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!(r"(?i)\b(?:{})\b", p)).expect("Invalid exclusion regex"))
        .collect()
}

fn first_match(patterns: &[Regex], name: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.find(name).map(|m| m.as_str().to_string()))
}

/// A drink word found where it names the item itself.
fn beverage_match(name: &str) -> Option<String> {
    if DISH_PATTERNS.iter().any(|re| re.is_match(name)) {
        return None;
    }

    BEVERAGE_PATTERNS
        .iter()
        .flat_map(|re| re.find_iter(name))
        .find(|m| {
            let before = &name[..m.start()];
            let after = &name[m.end()..];
            if before.trim().is_empty() {
                return true;
            }
            let closes_name = !after.chars().any(char::is_alphanumeric);
            let linked = before
                .split_whitespace()
                .last()
                .is_some_and(|word| LINKING_WORDS.contains(&word.to_lowercase().as_str()));
            closes_name && !linked
        })
        .map(|m| m.as_str().to_string())
}

/// Check an item name against the fixed exclusion patterns.
///
/// Brands are checked first, then beverage terms, then packaging tokens.
pub fn check_exclusion(name: &str) -> Option<ExclusionMatch> {
    let name = name.trim();
    if let Some(matched) = first_match(&BRAND_PATTERNS, name) {
        return Some(ExclusionMatch {
            category: ExclusionCategory::Brand,
            matched,
        });
    }
    if let Some(matched) = beverage_match(name) {
        return Some(ExclusionMatch {
            category: ExclusionCategory::Beverage,
            matched,
        });
    }
    first_match(&PACKAGING_PATTERNS, name).map(|matched| ExclusionMatch {
        category: ExclusionCategory::Packaging,
        matched,
    })
}

pub fn is_excluded(name: &str) -> bool {
    check_exclusion(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brands_are_excluded() {
        let m = check_exclusion("Coca-Cola Zero").unwrap();
        assert_eq!(m.category, ExclusionCategory::Brand);
        assert_eq!(m.matched, "Coca-Cola");
        assert!(is_excluded("Heineken"));
        assert!(is_excluded("Apă Borsec"));
    }

    #[test]
    fn beverages_are_excluded() {
        assert_eq!(
            check_exclusion("Vin roșu de casă").unwrap().category,
            ExclusionCategory::Beverage
        );
        assert!(is_excluded("Apă plată"));
        assert!(is_excluded("Fresh orange juice"));
        assert!(is_excluded("Limonadă cu mentă"));
        assert!(is_excluded("Espresso"));
    }

    #[test]
    fn packaging_units_are_excluded() {
        let m = check_exclusion("Apple 330ml").unwrap();
        assert_eq!(m.category, ExclusionCategory::Packaging);
        assert!(is_excluded("Something 0,5 l"));
        assert!(is_excluded("Ayran la sticlă"));
    }

    #[test]
    fn dishes_are_not_excluded() {
        for name in [
            "Ciorbă de burtă",
            "Mămăligă cu brânză și smântână",
            "Grilled chicken with vinaigrette",
            "Pecan pie",
            "Steak tartare",
            "Papanași cu dulceață",
        ] {
            assert!(check_exclusion(name).is_none(), "{} should not be excluded", name);
        }
    }

    #[test]
    fn dishes_cooked_with_drinks_are_not_excluded() {
        for name in [
            "Ciolan de porc la bere",
            "Pui în sos de vin",
            "Coq au vin",
            "Beer-battered fish and chips",
            "Tort de cafea",
            "Tiramisu cu espresso",
            "Somon cu sos de suc de portocale",
            "Cola de vită",
            "Midii în vin alb",
            "Tochitură cu vin",
            "Chocolate cake with coffee",
        ] {
            assert_eq!(check_exclusion(name), None, "{} should not be excluded", name);
        }
    }

    #[test]
    fn drinks_named_by_their_head_word_are_excluded() {
        for (name, word) in [
            ("Bere la halbă", "Bere"),
            ("Vin roșu la pahar", "Vin"),
            ("Ceai de mentă", "Ceai"),
            ("Fresh orange juice", "juice"),
            ("Iced tea", "tea"),
            ("Cafea", "Cafea"),
            ("  Espresso dublu", "Espresso"),
        ] {
            let m = check_exclusion(name).unwrap_or_else(|| panic!("{} should be excluded", name));
            assert_eq!(m.category, ExclusionCategory::Beverage);
            assert_eq!(m.matched, word);
        }
    }
}
