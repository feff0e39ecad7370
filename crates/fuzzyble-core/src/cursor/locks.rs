//! Per-column lock registry

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};

use crate::column::FuzzyColumn;

/// One `RwLock` per fuzzy column, created on first use.
///
/// State transitions (`create`, `populate`, `remove`) hold the write side;
/// queries hold the read side. Different columns never contend with each
/// other.
#[derive(Debug, Default)]
pub(crate) struct ColumnLocks {
    locks: Mutex<AHashMap<FuzzyColumn, Arc<RwLock<()>>>>,
}

impl ColumnLocks {
    pub(crate) fn get(&self, column: &FuzzyColumn) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(column.clone()).or_default())
    }
}
