//! Indexed column identity and metadata types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A `(table, column)` pair on which fuzzy search is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuzzyColumn {
    pub table: String,
    pub column: String,
}

impl FuzzyColumn {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for FuzzyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.table, self.column)
    }
}

/// Matching algorithm selected for a search session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// More suggestions, less relevant
    Trigram,
    /// Trigram with a minimum overlap ratio
    Trigram2,
    /// More relevant, fewer suggestions
    WordLen,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [Self::Trigram, Self::Trigram2, Self::WordLen];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigram => "trigram",
            Self::Trigram2 => "trigram2",
            Self::WordLen => "word_len",
        }
    }

    /// Posting key scheme this strategy reads and writes.
    pub fn scheme(&self) -> KeyScheme {
        match self {
            Self::Trigram | Self::Trigram2 => KeyScheme::Trigram,
            Self::WordLen => KeyScheme::WordLen,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trigram" => Ok(Self::Trigram),
            "trigram2" => Ok(Self::Trigram2),
            "word_len" => Ok(Self::WordLen),
            other => Err(format!("unknown strategy: {}", other)),
        }
    }
}

/// Discriminator of the posting key space.
///
/// Strategies sharing a scheme can read each other's postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScheme {
    Trigram,
    WordLen,
}

impl KeyScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trigram => "trigram",
            Self::WordLen => "word_len",
        }
    }
}

impl fmt::Display for KeyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of index metadata per fuzzy column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub column: FuzzyColumn,
    /// Strategy the postings were last built with
    pub strategy: StrategyKind,
    pub populated: bool,
    /// Milliseconds since the Unix epoch
    pub last_update: i64,
}

/// Lifecycle of a column in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnState {
    Unindexed,
    Unpopulated,
    Populated,
}

impl ColumnState {
    pub fn from_metadata(metadata: Option<&IndexMetadata>) -> Self {
        match metadata {
            None => Self::Unindexed,
            Some(m) if m.populated => Self::Populated,
            Some(_) => Self::Unpopulated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_equality_is_structural() {
        assert_eq!(FuzzyColumn::new("people", "name"), FuzzyColumn::new("people", "name"));
        assert_ne!(FuzzyColumn::new("people", "name"), FuzzyColumn::new("people", "email"));
    }

    #[test]
    fn test_column_display() {
        assert_eq!(FuzzyColumn::new("tafsir", "content").to_string(), "tafsir/content");
    }

    #[test]
    fn test_strategy_kind_roundtrip_through_str() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
        }
        assert!("bigram".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_trigram_variants_share_scheme() {
        assert_eq!(StrategyKind::Trigram.scheme(), StrategyKind::Trigram2.scheme());
        assert_ne!(StrategyKind::Trigram.scheme(), StrategyKind::WordLen.scheme());
    }

    #[test]
    fn test_state_from_metadata() {
        let mut meta = IndexMetadata {
            column: FuzzyColumn::new("t", "c"),
            strategy: StrategyKind::Trigram,
            populated: false,
            last_update: 0,
        };
        assert_eq!(ColumnState::from_metadata(None), ColumnState::Unindexed);
        assert_eq!(ColumnState::from_metadata(Some(&meta)), ColumnState::Unpopulated);
        meta.populated = true;
        assert_eq!(ColumnState::from_metadata(Some(&meta)), ColumnState::Populated);
    }
}
