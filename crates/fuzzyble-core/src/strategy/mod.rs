//! Matching strategies
//!
//! A strategy decides how column values become index keys, how a search term
//! becomes an index lookup, and how the candidates found are ordered.
//!
//! | Strategy | Keys | Candidates | Trade-off |
//! |----------|------|------------|-----------|
//! | [`Trigram`] | 3-char windows | share one trigram | more suggestions, less relevant |
//! | [`Trigram2`] | 3-char windows | share `min_overlap` of trigrams | fewer, tighter suggestions |
//! | [`WordLen`] | `(word, length)` | similar word of the same length | most relevant, fewest suggestions |
//!
//! Terms shorter than [`MIN_FUZZY_LENGTH`] characters are never tokenized:
//! every strategy plans a verbatim substring scan for them.

mod trigram;
mod word_len;

use std::collections::BTreeSet;

use crate::column::{KeyScheme, StrategyKind};
use crate::config::StrategyConfig;
use crate::text::{char_len, normalize, MIN_FUZZY_LENGTH};

pub use trigram::{Trigram, Trigram2};
pub use word_len::WordLen;

/// A normalized match key stored in the posting table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKey {
    Trigram(String),
    Word { word: String, len: u32 },
}

impl IndexKey {
    /// Word key bucketed by its character length.
    pub fn word(word: impl Into<String>) -> Self {
        let word = word.into();
        let len = char_len(&word) as u32;
        Self::Word { word, len }
    }

    /// Rebuild a key from its stored parts.
    pub fn from_parts(scheme: KeyScheme, token: impl Into<String>) -> Self {
        match scheme {
            KeyScheme::Trigram => Self::Trigram(token.into()),
            KeyScheme::WordLen => Self::word(token),
        }
    }

    pub fn scheme(&self) -> KeyScheme {
        match self {
            Self::Trigram(_) => KeyScheme::Trigram,
            Self::Word { .. } => KeyScheme::WordLen,
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Self::Trigram(t) => t,
            Self::Word { word, .. } => word,
        }
    }

    /// Word length for word keys, 0 for trigrams.
    pub fn bucket(&self) -> u32 {
        match self {
            Self::Trigram(_) => 0,
            Self::Word { len, .. } => *len,
        }
    }
}

/// How a search term is resolved against the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    /// Bypass the index and scan source values for this substring
    Verbatim(String),
    /// Look these keys up directly
    Keys(BTreeSet<IndexKey>),
    /// Load the vocabulary of these word-length buckets, then [`Strategy::expand`]
    Buckets(BTreeSet<u32>),
}

/// Pluggable tokenization and ranking policy.
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn scheme(&self) -> KeyScheme {
        self.kind().scheme()
    }

    /// Keys under which a column value is indexed. Never fails.
    fn tokenize(&self, value: &str) -> BTreeSet<IndexKey>;

    /// Index lookup for a search term.
    fn query_plan(&self, term: &str) -> QueryPlan;

    /// Turn a bucketed vocabulary into lookup keys for `term`.
    fn expand(&self, _term: &str, _vocabulary: &[String]) -> BTreeSet<IndexKey> {
        BTreeSet::new()
    }

    /// Filter and order candidate values; ties keep their input order.
    fn rank(&self, candidates: Vec<String>, term: &str) -> Vec<String>;
}

impl StrategyKind {
    /// Instantiate the strategy with the given tuning.
    pub fn build(&self, config: &StrategyConfig) -> Box<dyn Strategy> {
        match self {
            Self::Trigram => Box::new(Trigram::new()),
            Self::Trigram2 => Box::new(Trigram2::with_min_overlap(config.min_overlap)),
            Self::WordLen => Box::new(WordLen::from_config(config)),
        }
    }
}

/// Plan shared by all strategies for blank and short terms.
fn short_term_plan(term: &str) -> Option<QueryPlan> {
    let normalized = normalize(term);
    if normalized.is_empty() {
        return Some(QueryPlan::Keys(BTreeSet::new()));
    }
    if char_len(&normalized) < MIN_FUZZY_LENGTH {
        return Some(QueryPlan::Verbatim(term.trim().to_string()));
    }
    None
}

/// 0 = exact, 1 = substring, 2 = fuzzy only. Both sides normalized.
fn match_tier(value: &str, term: &str) -> u8 {
    if value == term {
        0
    } else if value.contains(term) {
        1
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_key_bucket_is_char_length() {
        let key = IndexKey::word("née");
        assert_eq!(key.bucket(), 3);
        assert_eq!(key.token(), "née");
        assert_eq!(key.scheme(), KeyScheme::WordLen);
    }

    #[test]
    fn test_key_from_parts() {
        assert_eq!(
            IndexKey::from_parts(KeyScheme::Trigram, "jon"),
            IndexKey::Trigram("jon".into())
        );
        assert_eq!(IndexKey::from_parts(KeyScheme::WordLen, "snow"), IndexKey::word("snow"));
    }

    #[test]
    fn test_short_term_plan() {
        assert_eq!(short_term_plan("   "), Some(QueryPlan::Keys(BTreeSet::new())));
        assert_eq!(short_term_plan(" Jo "), Some(QueryPlan::Verbatim("Jo".into())));
        assert_eq!(short_term_plan("jon"), None);
    }

    #[test]
    fn test_every_strategy_uses_verbatim_for_short_terms() {
        let config = StrategyConfig::default();
        for kind in StrategyKind::ALL {
            let strategy = kind.build(&config);
            assert_eq!(strategy.kind(), kind);
            assert_eq!(strategy.query_plan("ab"), QueryPlan::Verbatim("ab".into()));
        }
    }

    #[test]
    fn test_match_tier() {
        assert_eq!(match_tier("jon snow", "jon snow"), 0);
        assert_eq!(match_tier("jon snow", "snow"), 1);
        assert_eq!(match_tier("jon snow", "jan"), 2);
    }
}
