//! Word-length strategy
//!
//! Every word of a value is indexed with its character length. A query word
//! only meets vocabulary words from its own length bucket (optionally widened
//! by `bucket_spread`), and of those only the ones within the similarity
//! threshold are looked up. Favours typo correction over broad suggestion.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use super::{match_tier, short_term_plan, IndexKey, QueryPlan, Strategy};
use crate::column::StrategyKind;
use crate::config::StrategyConfig;
use crate::similarity::{Levenshtein, Similarity};
use crate::text::{char_len, normalize, words};

pub struct WordLen {
    similarity: Box<dyn Similarity>,
    bucket_spread: u32,
}

impl WordLen {
    /// Levenshtein distance ≤ 2, exact length buckets.
    pub fn new() -> Self {
        Self {
            similarity: Box::new(Levenshtein::default()),
            bucket_spread: 0,
        }
    }

    pub fn from_config(config: &StrategyConfig) -> Self {
        Self::new()
            .with_similarity(Levenshtein::new(config.max_edit_distance))
            .with_bucket_spread(config.bucket_spread)
    }

    pub fn with_similarity(mut self, similarity: impl Similarity + 'static) -> Self {
        self.similarity = Box::new(similarity);
        self
    }

    pub fn with_bucket_spread(mut self, spread: u32) -> Self {
        self.bucket_spread = spread;
        self
    }

    fn buckets_for(&self, word: &str) -> RangeInclusive<u32> {
        let len = char_len(word) as u32;
        let low = len.saturating_sub(self.bucket_spread).max(1);
        low..=len + self.bucket_spread
    }

    /// `word` sits in one of `query`'s buckets and is similar enough to it.
    fn matches(&self, query: &str, word: &str) -> bool {
        self.buckets_for(query).contains(&(char_len(word) as u32))
            && self.similarity.is_similar(query, word)
    }

    /// Sum of similarity indexes of the query words matched in `value`,
    /// with the number of words matched.
    fn score(&self, query_words: &[String], value: &str) -> (usize, i64) {
        let value_words = words(value);
        let mut matched = 0;
        let mut total = 0;

        for query in query_words {
            let best = value_words
                .iter()
                .filter(|w| self.matches(query, w))
                .map(|w| self.similarity.similarity_index(query, w))
                .max();
            if let Some(index) = best {
                matched += 1;
                total += index;
            }
        }
        (matched, total)
    }
}

impl Default for WordLen {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for WordLen {
    fn kind(&self) -> StrategyKind {
        StrategyKind::WordLen
    }

    fn tokenize(&self, value: &str) -> BTreeSet<IndexKey> {
        words(value).into_iter().map(IndexKey::word).collect()
    }

    fn query_plan(&self, term: &str) -> QueryPlan {
        if let Some(plan) = short_term_plan(term) {
            return plan;
        }
        let words = words(term);
        if words.is_empty() {
            // Nothing indexable, values like this are only reachable verbatim
            return QueryPlan::Verbatim(term.trim().to_string());
        }
        QueryPlan::Buckets(words.iter().flat_map(|w| self.buckets_for(w)).collect())
    }

    fn expand(&self, term: &str, vocabulary: &[String]) -> BTreeSet<IndexKey> {
        let query_words = words(term);
        vocabulary
            .iter()
            .filter(|candidate| {
                query_words.iter().any(|q| self.matches(q, candidate))
            })
            .map(|w| IndexKey::word(w.as_str()))
            .collect()
    }

    fn rank(&self, candidates: Vec<String>, term: &str) -> Vec<String> {
        let needle = normalize(term);
        let query_words = words(term);
        if query_words.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(u8, usize, i64, String)> = candidates
            .into_iter()
            .filter_map(|value| {
                let tier = match_tier(&normalize(&value), &needle);
                let (matched, total) = self.score(&query_words, &value);
                if tier == 2 && matched == 0 {
                    return None;
                }
                Some((tier, matched, total, value))
            })
            .collect();

        scored.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| b.2.cmp(&a.2))
        });
        scored.into_iter().map(|(_, _, _, value)| value).collect()
    }
}
