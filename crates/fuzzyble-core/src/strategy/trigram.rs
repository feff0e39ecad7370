//! Trigram strategies

use std::collections::BTreeSet;

use super::{match_tier, short_term_plan, IndexKey, QueryPlan, Strategy};
use crate::column::StrategyKind;
use crate::text::{normalize, trigrams};

/// Any value sharing a trigram with the term is a candidate.
///
/// Ordered by exact match, then substring match, then shared-trigram count.
#[derive(Debug, Clone, Copy, Default)]
pub struct Trigram;

impl Trigram {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for Trigram {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Trigram
    }

    fn tokenize(&self, value: &str) -> BTreeSet<IndexKey> {
        trigram_keys(value)
    }

    fn query_plan(&self, term: &str) -> QueryPlan {
        short_term_plan(term).unwrap_or_else(|| QueryPlan::Keys(trigram_keys(term)))
    }

    fn rank(&self, candidates: Vec<String>, term: &str) -> Vec<String> {
        rank_by_overlap(candidates, term, None)
    }
}

/// Trigram matching that drops weak candidates.
///
/// A candidate must share at least `min_overlap` of the term's trigrams
/// unless it contains the term outright.
#[derive(Debug, Clone, Copy)]
pub struct Trigram2 {
    min_overlap: f64,
}

impl Trigram2 {
    pub const DEFAULT_MIN_OVERLAP: f64 = 0.5;

    pub fn new() -> Self {
        Self::with_min_overlap(Self::DEFAULT_MIN_OVERLAP)
    }

    pub fn with_min_overlap(min_overlap: f64) -> Self {
        Self {
            min_overlap: min_overlap.clamp(0.0, 1.0),
        }
    }

    pub fn min_overlap(&self) -> f64 {
        self.min_overlap
    }
}

impl Default for Trigram2 {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for Trigram2 {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Trigram2
    }

    fn tokenize(&self, value: &str) -> BTreeSet<IndexKey> {
        trigram_keys(value)
    }

    fn query_plan(&self, term: &str) -> QueryPlan {
        short_term_plan(term).unwrap_or_else(|| QueryPlan::Keys(trigram_keys(term)))
    }

    fn rank(&self, candidates: Vec<String>, term: &str) -> Vec<String> {
        rank_by_overlap(candidates, term, Some(self.min_overlap))
    }
}

fn trigram_keys(value: &str) -> BTreeSet<IndexKey> {
    trigrams(value).into_iter().map(IndexKey::Trigram).collect()
}

fn rank_by_overlap(candidates: Vec<String>, term: &str, min_overlap: Option<f64>) -> Vec<String> {
    let needle = normalize(term);
    let query = trigrams(&needle);
    if query.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(u8, usize, String)> = candidates
        .into_iter()
        .filter_map(|value| {
            let normalized = normalize(&value);
            let tier = match_tier(&normalized, &needle);
            let shared = trigrams(&normalized).intersection(&query).count();

            if tier == 2 {
                if shared == 0 {
                    return None;
                }
                if let Some(min) = min_overlap {
                    if (shared as f64 / query.len() as f64) < min {
                        return None;
                    }
                }
            }
            Some((tier, shared, value))
        })
        .collect();

    // Stable: equal scores keep index scan order
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));
    scored.into_iter().map(|(_, _, value)| value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tokenize_produces_trigram_keys() {
        let keys = Trigram::new().tokenize("Doe");
        assert_eq!(keys, BTreeSet::from([IndexKey::Trigram("doe".into())]));
    }

    #[test]
    fn test_tokenize_blank_is_empty() {
        assert!(Trigram::new().tokenize("  ").is_empty());
    }

    #[test]
    fn test_query_plan_uses_term_trigrams() {
        let plan = Trigram::new().query_plan("Snow");
        assert_eq!(
            plan,
            QueryPlan::Keys(BTreeSet::from([
                IndexKey::Trigram("now".into()),
                IndexKey::Trigram("sno".into()),
            ]))
        );
    }

    #[test]
    fn test_rank_exact_then_substring_then_overlap() {
        let ranked = Trigram::new().rank(
            strings(&["Snowy Owl", "snow", "Jon Snow", "Know"]),
            "Snow",
        );
        assert_eq!(ranked, strings(&["snow", "Snowy Owl", "Jon Snow", "Know"]));
    }

    #[test]
    fn test_rank_ties_keep_scan_order() {
        let ranked = Trigram::new().rank(strings(&["b now", "a now"]), "snow");
        assert_eq!(ranked, strings(&["b now", "a now"]));
    }

    #[test]
    fn test_rank_drops_values_without_shared_trigrams() {
        let ranked = Trigram::new().rank(strings(&["Jane Roe", "Jon Snow"]), "jon");
        assert_eq!(ranked, strings(&["Jon Snow"]));
    }

    #[test]
    fn test_trigram2_filters_low_overlap() {
        // "johnson" has 5 trigrams; "johnsen" shares 3, "johansson" only 2
        // (joh, son) and falls below 0.5.
        let candidates = strings(&["Johnsen", "Johansson"]);
        let loose = Trigram::new().rank(candidates.clone(), "johnson");
        let strict = Trigram2::new().rank(candidates, "johnson");

        assert_eq!(loose.len(), 2);
        assert_eq!(strict, strings(&["Johnsen"]));
    }

    #[test]
    fn test_trigram2_keeps_substring_matches() {
        let strict = Trigram2::with_min_overlap(1.0);
        let ranked = strict.rank(strings(&["The Jon Snow saga"]), "jon snow");
        assert_eq!(ranked, strings(&["The Jon Snow saga"]));
    }

    #[test]
    fn test_trigram2_overlap_is_clamped() {
        assert_eq!(Trigram2::with_min_overlap(3.0).min_overlap(), 1.0);
        assert_eq!(Trigram2::with_min_overlap(-1.0).min_overlap(), 0.0);
    }
}
