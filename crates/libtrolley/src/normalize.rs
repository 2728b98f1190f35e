// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{cmp::Ordering, collections::BTreeSet};

use unicode_normalization::{UnicodeNormalization as _, char::is_combining_mark};

// same class as a regex `\w`: ascii letters, digits and underscore
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// normalizes a free-text name for matching and deduplication.
/// replaces non-word chars with spaces, collapses whitespace runs, trims.
/// returns an empty string for missing or blank input.
pub fn normalize(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };

    let mut result = String::with_capacity(raw.len());
    let mut prev_space = true; // start true to skip leading separators

    for c in raw.chars() {
        if is_word_char(c) {
            result.push(c);
            prev_space = false;
        } else {
            if !prev_space {
                result.push(' ');
            }
            prev_space = true;
        }
    }

    // trim the trailing separator, if any
    if result.ends_with(' ') {
        result.pop();
    }

    result
}

/// splits a free-text filter into lowercased, non-empty search tokens.
pub fn to_token_set(raw: Option<&str>) -> BTreeSet<String> {
    normalize(raw)
        .to_lowercase()
        .split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// returns true when `text` contains every token, case-insensitively.
pub fn contains_all_tokens(text: &str, tokens: &BTreeSet<String>) -> bool {
    if tokens.is_empty() {
        return true;
    }

    let haystack = text.to_lowercase();
    tokens.iter().all(|token| haystack.contains(token.as_str()))
}

/// lowercased base letters of `name`: decomposed, with diacritics dropped.
fn base_letters(name: &str) -> impl Iterator<Item = char> + '_ {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn accented_letters(name: &str) -> impl Iterator<Item = char> + '_ {
    name.nfd().flat_map(char::to_lowercase)
}

/// compares display names the way a locale collator would.
///
/// levels, in order: base letters ignoring case and accents, then accents
/// (unaccented first), then case (lowercase first).
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let primary = base_letters(a).cmp(base_letters(b));
    if primary != Ordering::Equal {
        return primary;
    }

    let secondary = accented_letters(a).cmp(accented_letters(b));
    if secondary != Ordering::Equal {
        return secondary;
    }

    for (ca, cb) in a.nfd().zip(b.nfd()) {
        match (ca.is_lowercase(), cb.is_lowercase()) {
            (true, false) if cb.is_uppercase() => return Ordering::Less,
            (false, true) if ca.is_uppercase() => return Ordering::Greater,
            _ => {}
        }
    }

    a.chars().count().cmp(&b.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_and_collapses() {
        assert_eq!(normalize(Some("  Milk,   2L!! ")), "Milk 2L");
        assert_eq!(normalize(Some("free-range\teggs")), "free range eggs");
        assert_eq!(normalize(Some("snake_case stays")), "snake_case stays");
    }

    #[test]
    fn test_normalize_empty_inputs() {
        assert_eq!(normalize(None), "");
        assert_eq!(normalize(Some("")), "");
        assert_eq!(normalize(Some("   \t ")), "");
        assert_eq!(normalize(Some("!@#$%")), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = [
            "  Milk,   2L!! ",
            "crème brûlée",
            "a--b__c  d",
            "",
            "...",
            "Tim Tam (200g) - Original",
        ];
        for sample in samples {
            let once = normalize(Some(sample));
            assert_eq!(normalize(Some(&once)), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_normalize_treats_non_ascii_as_separator() {
        assert_eq!(normalize(Some("crème brûlée")), "cr me br l e");
        assert_eq!(normalize(Some("Jalapeño")), "Jalape o");
        assert_eq!(normalize(Some("日本")), "");

        let tokens = to_token_set(Some("Jalapeño"));
        let expected: BTreeSet<String> = ["jalape", "o"].into_iter().map(String::from).collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_token_set_lowercases_and_dedups() {
        let tokens = to_token_set(Some("Milk milk, FULL-cream"));
        let expected: BTreeSet<String> = ["cream", "full", "milk"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(tokens, expected);
        assert!(to_token_set(None).is_empty());
        assert!(to_token_set(Some(" , ")).is_empty());
    }

    #[test]
    fn test_contains_all_tokens() {
        let tokens = to_token_set(Some("cream milk"));
        assert!(contains_all_tokens("Full Cream Milk 2L", &tokens));
        assert!(!contains_all_tokens("Skim Milk", &tokens));
        assert!(contains_all_tokens("anything", &BTreeSet::new()));
    }

    #[test]
    fn test_compare_names_case_insensitive_primary() {
        assert_eq!(compare_names("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_names("Banana", "apple"), Ordering::Greater);
        assert_eq!(compare_names("bread", "bread"), Ordering::Equal);
    }

    #[test]
    fn test_compare_names_lowercase_first_on_tie() {
        assert_eq!(compare_names("milk", "Milk"), Ordering::Less);
        assert_eq!(compare_names("Milk", "milk"), Ordering::Greater);
        assert_eq!(compare_names("egg", "eggs"), Ordering::Less);
    }

    #[test]
    fn test_compare_names_folds_accents() {
        assert_eq!(compare_names("Éclair", "zucchini"), Ordering::Less);
        assert_eq!(compare_names("über", "zebra"), Ordering::Less);
        assert_eq!(compare_names("crème", "cress"), Ordering::Less);
        assert_eq!(compare_names("zebra", "Äpfel"), Ordering::Greater);
    }

    #[test]
    fn test_compare_names_accent_breaks_ties_before_case() {
        assert_eq!(compare_names("eclair", "éclair"), Ordering::Less);
        assert_eq!(compare_names("Eclair", "éclair"), Ordering::Less);
        assert_eq!(compare_names("éclair", "Éclair"), Ordering::Less);
        assert_eq!(compare_names("café", "café"), Ordering::Equal);
    }
}
