//! Text normalisation and key extraction

use std::collections::BTreeSet;

/// Terms with fewer normalised characters than this bypass the index.
pub const MIN_FUZZY_LENGTH: usize = 3;

/// Lower-case, trim and collapse whitespace runs to a single space.
pub fn normalize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for word in value.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}

/// Overlapping 3-character windows of the normalised value.
///
/// Values of one or two characters yield themselves as the only key;
/// blank values yield nothing.
pub fn trigrams(value: &str) -> BTreeSet<String> {
    let normalized = normalize(value);
    let chars: Vec<char> = normalized.chars().collect();

    if chars.is_empty() {
        return BTreeSet::new();
    }
    if chars.len() < 3 {
        return BTreeSet::from([normalized]);
    }

    chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Normalised words, split on every non-alphanumeric character.
pub fn words(value: &str) -> Vec<String> {
    normalize(value)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Character count, not byte length
#[inline]
pub fn char_len(value: &str) -> usize {
    value.chars().count()
}
