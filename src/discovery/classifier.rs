// file: src/discovery/classifier.rs
// description: filename classification into numbered test slots
// reference: configurable case-insensitive filename patterns

use std::path::Path;

pub struct SlotClassifier {
    expected: u32,
    patterns: Vec<String>,
}

impl SlotClassifier {
    /// `patterns` are templates where `{n}` stands for the slot number.
    pub fn new(expected: u32, patterns: Vec<String>) -> Self {
        let patterns = patterns.into_iter().map(|p| p.to_lowercase()).collect();
        Self { expected, patterns }
    }

    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Lowercased patterns for one slot.
    pub fn patterns_for(&self, slot: u32) -> Vec<String> {
        self.patterns
            .iter()
            .map(|p| p.replace("{n}", &slot.to_string()))
            .collect()
    }

    pub fn matches_slot(&self, path: &Path, slot: u32) -> bool {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_lowercase();

        self.patterns_for(slot)
            .iter()
            .any(|pattern| contains_unextended(&file_name, pattern))
    }

    /// Every slot in `1..=expected` whose patterns match this filename.
    pub fn classify(&self, path: &Path) -> Vec<u32> {
        (1..=self.expected)
            .filter(|&slot| self.matches_slot(path, slot))
            .collect()
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        file_name.starts_with("~$") || file_name.starts_with('.')
    }
}

/// Substring match that refuses a hit followed by another digit, so `test_1`
/// does not bind `test_10`.
fn contains_unextended(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    let mut start = 0;
    while let Some(offset) = haystack[start..].find(needle) {
        let end = start + offset + needle.len();
        let next_is_digit = haystack[end..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit());
        if !next_is_digit {
            return true;
        }
        start = start + offset + 1;
        while !haystack.is_char_boundary(start) {
            start += 1;
        }
    }

    false
}
