//! IndexStore tests for SqliteIndexStore

use fuzzyble_core::storage::IndexStore;
use fuzzyble_core::{FuzzyColumn, IndexKey, KeyScheme, StoreError, StrategyKind};
use fuzzyble_sqlite::SqliteIndexStore;
use pretty_assertions::assert_eq;

fn column() -> FuzzyColumn {
    FuzzyColumn::new("people", "name")
}

fn trigram(t: &str) -> IndexKey {
    IndexKey::Trigram(t.to_string())
}

#[test]
fn test_create_index_records_metadata() {
    let store = SqliteIndexStore::in_memory().unwrap();
    assert!(!store.is_indexed(&column()).unwrap());

    assert!(store.create_index(&column(), StrategyKind::Trigram2, false).unwrap());
    let metadata = store.metadata(&column()).unwrap().unwrap();
    assert_eq!(metadata.column, column());
    assert_eq!(metadata.strategy, StrategyKind::Trigram2);
    assert!(!metadata.populated);
    assert!(metadata.last_update > 0);
}

#[test]
fn test_create_index_without_force_keeps_postings() {
    let store = SqliteIndexStore::in_memory().unwrap();
    store.create_index(&column(), StrategyKind::Trigram, false).unwrap();
    store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap();
    store.mark_populated(&column(), true).unwrap();

    assert!(!store.create_index(&column(), StrategyKind::Trigram, false).unwrap());
    assert_eq!(store.posting_count(&column()).unwrap(), 1);
    assert!(store.is_populated(&column()).unwrap());
}

#[test]
fn test_force_create_drops_postings_and_resets_flag() {
    let store = SqliteIndexStore::in_memory().unwrap();
    store.create_index(&column(), StrategyKind::Trigram, false).unwrap();
    store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap();
    store.mark_populated(&column(), true).unwrap();

    assert!(store.create_index(&column(), StrategyKind::WordLen, true).unwrap());
    assert_eq!(store.posting_count(&column()).unwrap(), 0);
    let metadata = store.metadata(&column()).unwrap().unwrap();
    assert!(!metadata.populated);
    assert_eq!(metadata.strategy, StrategyKind::WordLen);
}

#[test]
fn test_add_posting_is_idempotent() {
    let store = SqliteIndexStore::in_memory().unwrap();
    store.create_index(&column(), StrategyKind::Trigram, false).unwrap();

    assert!(store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap());
    assert!(!store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap());
    assert_eq!(store.posting_count(&column()).unwrap(), 1);
}

#[test]
fn test_add_postings_counts_new_rows() {
    let store = SqliteIndexStore::in_memory().unwrap();
    store.create_index(&column(), StrategyKind::Trigram, false).unwrap();

    let batch = vec![
        ("Jon".to_string(), vec![trigram("jon")]),
        ("Jon Snow".to_string(), vec![trigram("jon"), trigram("sno")]),
    ];
    assert_eq!(store.add_postings(&column(), &batch).unwrap(), 3);
    assert_eq!(store.add_postings(&column(), &batch).unwrap(), 0);
}

#[test]
fn test_writes_require_index() {
    let store = SqliteIndexStore::in_memory().unwrap();

    let err = store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    let err = store.mark_populated(&column(), true).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
    let err = store.set_strategy(&column(), StrategyKind::WordLen).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[test]
fn test_lookup_unions_in_first_seen_order() {
    let store = SqliteIndexStore::in_memory().unwrap();
    store.create_index(&column(), StrategyKind::Trigram, false).unwrap();
    store.add_posting(&column(), &trigram("now"), "Jon Snow").unwrap();
    store.add_posting(&column(), &trigram("doe"), "John Doe").unwrap();
    store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap();
    store.add_posting(&column(), &trigram("roe"), "Jane Roe").unwrap();

    let values = store
        .lookup(&column(), &[trigram("jon"), trigram("doe"), trigram("now")])
        .unwrap();
    assert_eq!(values, vec!["Jon Snow".to_string(), "John Doe".to_string()]);
    assert!(store.lookup(&column(), &[]).unwrap().is_empty());
}

#[test]
fn test_lookup_is_scoped_to_column_and_scheme() {
    let store = SqliteIndexStore::in_memory().unwrap();
    let other = FuzzyColumn::new("people", "city");
    store.create_index(&column(), StrategyKind::Trigram, false).unwrap();
    store.create_index(&other, StrategyKind::WordLen, false).unwrap();
    store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap();
    store.add_posting(&other, &IndexKey::word("jon"), "Jon Town").unwrap();

    assert_eq!(
        store.lookup(&column(), &[trigram("jon")]).unwrap(),
        vec!["Jon Snow".to_string()]
    );
    assert!(store.lookup(&column(), &[IndexKey::word("jon")]).unwrap().is_empty());
}

#[test]
fn test_lookup_with_many_keys() {
    let store = SqliteIndexStore::in_memory().unwrap();
    store.create_index(&column(), StrategyKind::Trigram, false).unwrap();

    let keys: Vec<IndexKey> = (0..1000).map(|i| trigram(&format!("k{:03}", i))).collect();
    store.add_posting(&column(), &keys[999], "last").unwrap();
    store.add_posting(&column(), &keys[0], "first").unwrap();

    assert_eq!(
        store.lookup(&column(), &keys).unwrap(),
        vec!["last".to_string(), "first".to_string()]
    );
}

#[test]
fn test_tokens_in_buckets() {
    let store = SqliteIndexStore::in_memory().unwrap();
    store.create_index(&column(), StrategyKind::WordLen, false).unwrap();
    store.add_posting(&column(), &IndexKey::word("jon"), "Jon Snow").unwrap();
    store.add_posting(&column(), &IndexKey::word("snow"), "Jon Snow").unwrap();
    store.add_posting(&column(), &IndexKey::word("doe"), "John Doe").unwrap();
    store.add_posting(&column(), &IndexKey::word("jon"), "Jon Doe").unwrap();

    assert_eq!(
        store.tokens_in_buckets(&column(), KeyScheme::WordLen, &[3]).unwrap(),
        vec!["jon".to_string(), "doe".to_string()]
    );
    assert_eq!(
        store.tokens_in_buckets(&column(), KeyScheme::WordLen, &[3, 4]).unwrap().len(),
        3
    );
    assert!(store
        .tokens_in_buckets(&column(), KeyScheme::Trigram, &[3])
        .unwrap()
        .is_empty());
}

#[test]
fn test_drop_index_and_list() {
    let store = SqliteIndexStore::in_memory().unwrap();
    store.create_index(&column(), StrategyKind::Trigram, false).unwrap();
    store
        .create_index(&FuzzyColumn::new("books", "title"), StrategyKind::WordLen, false)
        .unwrap();
    store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap();

    let listed: Vec<String> = store
        .list_indexes()
        .unwrap()
        .iter()
        .map(|m| m.column.to_string())
        .collect();
    assert_eq!(listed, vec!["books/title", "people/name"]);

    assert!(store.drop_index(&column()).unwrap());
    assert!(!store.drop_index(&column()).unwrap());
    assert_eq!(store.posting_count(&column()).unwrap(), 0);
    assert_eq!(store.list_indexes().unwrap().len(), 1);
}

#[test]
fn test_unknown_strategy_is_invalid_data() {
    let store = SqliteIndexStore::in_memory().unwrap();
    store.create_index(&column(), StrategyKind::Trigram, false).unwrap();
    store.with_connection(|conn| {
        conn.execute("UPDATE fuzzyble_meta_data SET strategy = 'bigram'", [])
            .unwrap();
    });

    let err = store.metadata(&column()).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}

#[test]
fn test_reopen_keeps_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sync.db");

    {
        let store = SqliteIndexStore::open(&path).unwrap();
        store.create_index(&column(), StrategyKind::Trigram, false).unwrap();
        store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap();
        store.mark_populated(&column(), true).unwrap();
    }

    let store = SqliteIndexStore::open(&path).unwrap();
    assert!(store.is_populated(&column()).unwrap());
    assert_eq!(
        store.lookup(&column(), &[trigram("jon")]).unwrap(),
        vec!["Jon Snow".to_string()]
    );
}
