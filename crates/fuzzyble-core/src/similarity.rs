//! Word similarity measures used for typo tolerance

use strsim::levenshtein;

/// How two words are compared by the word-length strategy.
pub trait Similarity: Send + Sync {
    /// Whether the words are close enough to count as a match.
    fn is_similar(&self, a: &str, b: &str) -> bool;

    /// Larger is more similar.
    fn similarity_index(&self, a: &str, b: &str) -> i64;
}

/// Levenshtein edit distance with an inclusive threshold
#[derive(Debug, Clone, Copy)]
pub struct Levenshtein {
    max_distance: usize,
}

impl Levenshtein {
    pub const DEFAULT_MAX_DISTANCE: usize = 2;

    pub fn new(max_distance: usize) -> Self {
        Self { max_distance }
    }

    pub fn max_distance(&self) -> usize {
        self.max_distance
    }

    /// Edit distance between two words, counted in characters.
    pub fn distance(&self, a: &str, b: &str) -> usize {
        levenshtein(a, b)
    }
}

impl Default for Levenshtein {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DISTANCE)
    }
}

impl Similarity for Levenshtein {
    fn is_similar(&self, a: &str, b: &str) -> bool {
        self.distance(a, b) <= self.max_distance
    }

    fn similarity_index(&self, a: &str, b: &str) -> i64 {
        -(self.distance(a, b) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_words_are_similar() {
        let lev = Levenshtein::default();
        assert!(lev.is_similar("snow", "snow"));
        assert_eq!(lev.similarity_index("snow", "snow"), 0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let lev = Levenshtein::default();
        // kitten -> sitting is 3 edits
        assert!(!lev.is_similar("kitten", "sitting"));
        assert!(lev.is_similar("kitten", "sittin"));
    }

    #[test]
    fn test_similarity_index_orders_by_distance() {
        let lev = Levenshtein::default();
        assert!(lev.similarity_index("house", "hous") > lev.similarity_index("house", "hose1"));
    }

    #[test]
    fn test_custom_threshold() {
        let strict = Levenshtein::new(0);
        assert!(!strict.is_similar("jon", "jan"));
        assert_eq!(strict.max_distance(), 0);
    }

    #[test]
    fn test_distance_counts_chars() {
        let lev = Levenshtein::default();
        assert_eq!(lev.distance("née", "nee"), 1);
        assert_eq!(lev.distance("snow", "snow"), 0);
    }
}
