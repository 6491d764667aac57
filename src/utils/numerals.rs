//! Numeral-aware query matching.
//!
//! Catalog titles are inconsistent about numbering ("Part II" vs "Part 2").
//! These helpers expand a query into its roman/arabic variants so keyword
//! filtering does not depend on which convention a title uses.
//!
//! Only the closed table `i..=xx` (1 to 20) is recognised. Each variant
//! substitutes exactly one token, so numerals in different positions of a
//! multi-word query are never combined into one variant.

use std::collections::BTreeSet;

/// Roman numerals 1 through 20, indexed by value - 1
const ROMAN_NUMERALS: [&str; 20] = [
    "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii", "xiii", "xiv", "xv",
    "xvi", "xvii", "xviii", "xix", "xx",
];

/// Convert a lowercase roman numeral token from the table to its value
pub fn roman_to_arabic(token: &str) -> Option<u32> {
    ROMAN_NUMERALS
        .iter()
        .position(|roman| *roman == token)
        .map(|index| index as u32 + 1)
}

/// Convert a value in `1..=20` to its lowercase roman form
pub fn arabic_to_roman(value: u32) -> Option<&'static str> {
    match value {
        1..=20 => Some(ROMAN_NUMERALS[value as usize - 1]),
        _ => None,
    }
}

/// True if the text contains an ASCII digit or a roman numeral token from the table
pub fn contains_numeral(text: &str) -> bool {
    let lowered = text.to_lowercase();
    if lowered.chars().any(|c| c.is_ascii_digit()) {
        return true;
    }
    lowered
        .split_whitespace()
        .any(|token| roman_to_arabic(token).is_some())
}

/// All numeral variants of a query, always including the lowercased query itself
pub fn numeral_variants(query: &str) -> BTreeSet<String> {
    let lowered = query.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();

    let mut variants = BTreeSet::new();
    variants.insert(lowered.clone());

    for (index, token) in tokens.iter().enumerate() {
        if let Some(value) = roman_to_arabic(token) {
            variants.insert(replace_token(&tokens, index, &value.to_string()));
        }

        if let Some(roman) = parse_digits(token).and_then(arabic_to_roman) {
            variants.insert(replace_token(&tokens, index, roman));
        }
    }

    variants
}

/// True if any numeral variant of `query` occurs in `text` (case-insensitive)
pub fn matches_with_numerals(text: &str, query: &str) -> bool {
    let text = text.to_lowercase();
    numeral_variants(query)
        .iter()
        .any(|variant| text.contains(variant.as_str()))
}

fn parse_digits(token: &str) -> Option<u32> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn replace_token(tokens: &[&str], index: usize, replacement: &str) -> String {
    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| if i == index { replacement } else { token })
        .collect::<Vec<_>>()
        .join(" ")
}
