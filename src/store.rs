//! Relational store collaborator contract.
//!
//! Implementations execute parameterized queries against the key-ordered
//! remote table. Every method crosses a process/network boundary: adapters
//! must apply a bounded timeout to each call and report failures as typed
//! errors, never by blocking indefinitely.

use std::sync::Arc;

use tracing::warn;

use crate::predicate::Predicate;
use crate::record::Record;
use crate::reconcile::Counts;
use crate::types::{IncidKey, Result};

/// Executes row and count queries against the ordered remote table.
pub trait RelationalStore: Send + Sync + 'static {
    /// Counts rows matching the predicate.
    fn count_where(&self, predicate: &Predicate) -> Result<u64>;

    /// Loads up to `limit` rows matching the predicate, in key order.
    fn select_range(&self, predicate: &Predicate, limit: usize) -> Result<Vec<Record>>;

    /// Loads the rows whose key is in `keys`, in key order. Keys with no
    /// matching row are silently absent from the result.
    fn select_in(&self, keys: &[IncidKey]) -> Result<Vec<Record>>;

    /// Replaces the scratch side table's contents with `keys`. Never
    /// retried: a partial write would silently corrupt the next join-based
    /// reconciliation pass, so failures must surface immediately.
    fn write_scratch(&self, keys: &[IncidKey]) -> Result<()>;

    /// Expected incid/parent/fragment counts for the rows matching the
    /// predicate, computed on the database side.
    fn count_features(&self, predicate: &Predicate) -> Result<Counts>;
}

/// Wrapper that retries an idempotent read exactly once on failure.
///
/// Count and select queries are safe to reissue; `write_scratch` is not
/// idempotent from the reconciliation engine's point of view and is passed
/// through untouched so a failure fails the pass fast.
pub struct RetryingStore {
    inner: Arc<dyn RelationalStore>,
}

impl RetryingStore {
    /// Wraps a store adapter.
    pub fn new(inner: Arc<dyn RelationalStore>) -> Self {
        Self { inner }
    }

    fn retry_once<T>(&self, what: &'static str, call: impl Fn() -> Result<T>) -> Result<T> {
        match call() {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(error = %err, what, "store.read.retry");
                call()
            }
        }
    }
}

impl RelationalStore for RetryingStore {
    fn count_where(&self, predicate: &Predicate) -> Result<u64> {
        self.retry_once("count_where", || self.inner.count_where(predicate))
    }

    fn select_range(&self, predicate: &Predicate, limit: usize) -> Result<Vec<Record>> {
        self.retry_once("select_range", || self.inner.select_range(predicate, limit))
    }

    fn select_in(&self, keys: &[IncidKey]) -> Result<Vec<Record>> {
        self.retry_once("select_in", || self.inner.select_in(keys))
    }

    fn write_scratch(&self, keys: &[IncidKey]) -> Result<()> {
        self.inner.write_scratch(keys)
    }

    fn count_features(&self, predicate: &Predicate) -> Result<Counts> {
        self.retry_once("count_features", || self.inner.count_features(predicate))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{RelationalStore, RetryingStore};
    use crate::predicate::Predicate;
    use crate::testkit::MemoryStore;
    use crate::types::IncidKey;

    #[test]
    fn reads_are_retried_once() {
        let store = Arc::new(MemoryStore::new());
        store.insert_fragment("A1", 10, 1);
        store.fail_next_reads(1);

        let retrying = RetryingStore::new(store.clone());
        assert_eq!(retrying.count_where(&Predicate::All).unwrap(), 1);
        assert_eq!(store.read_calls(), 2, "failed read reissued exactly once");
    }

    #[test]
    fn scratch_writes_fail_fast() {
        let store = Arc::new(MemoryStore::new());
        store.fail_next_writes(1);

        let retrying = RetryingStore::new(store.clone());
        let keys = [IncidKey::from("A1")];
        assert!(retrying.write_scratch(&keys).is_err());
        assert_eq!(store.write_calls(), 1, "scratch write never reissued");
    }
}
