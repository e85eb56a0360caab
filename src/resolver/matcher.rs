// file: src/resolver/matcher.rs
// description: strict-to-loose similarity cascade between a header and a variant
// reference: pure scoring function, no file io

use lazy_static::lazy_static;
use regex::Regex;

pub const EXACT: f64 = 1.0;
pub const CASE_INSENSITIVE: f64 = 0.95;
pub const SUBSTRING: f64 = 0.8;
/// A variant made only of symbols (e.g. `%`) found inside a header. Kept just
/// above the resolution threshold so any word-bearing match outranks it.
pub const SYMBOL_SUBSTRING: f64 = 0.55;
pub const OVERLAP_FLOOR: f64 = 0.5;
pub const OVERLAP_CEILING: f64 = 0.8;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"[a-z0-9]+").expect("WORD regex is valid");
}

fn words(text: &str) -> Vec<&str> {
    WORD.find_iter(text).map(|m| m.as_str()).collect()
}

/// Score in `[0, 1]` for how well `header` matches `variant`.
pub fn match_score(header: &str, variant: &str) -> f64 {
    if header == variant {
        return EXACT;
    }

    let header_lower = header.trim().to_lowercase();
    let variant_lower = variant.trim().to_lowercase();

    if header_lower.is_empty() || variant_lower.is_empty() {
        return 0.0;
    }

    if header_lower == variant_lower {
        return CASE_INSENSITIVE;
    }

    let variant_words = words(&variant_lower);

    if header_lower.contains(&variant_lower) {
        return if variant_words.is_empty() {
            SYMBOL_SUBSTRING
        } else {
            SUBSTRING
        };
    }

    if variant_words.is_empty() {
        return 0.0;
    }

    let header_words = words(&header_lower);
    let matched = variant_words
        .iter()
        .filter(|w| header_words.contains(w))
        .count();

    if matched == 0 {
        return 0.0;
    }

    let ratio = matched as f64 / variant_words.len() as f64;
    // Full overlap without a contiguous substring stays strictly below SUBSTRING.
    let span = OVERLAP_CEILING - OVERLAP_FLOOR - 0.01;
    OVERLAP_FLOOR + span * ratio
}

/// Best score of `header` against any variant.
pub fn best_score<S: AsRef<str>>(header: &str, variants: &[S]) -> f64 {
    variants
        .iter()
        .map(|v| match_score(header, v.as_ref()))
        .fold(0.0, f64::max)
}
