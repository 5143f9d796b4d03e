//! The active database filter: an immutable, ordered key list.
//!
//! A session with no filter addresses the whole table by absolute row
//! number and carries no `SelectionSet` at all. An *empty* selection is a
//! real state (filter active, nothing matched) and is terminal: no record
//! is addressable until a new selection is built. Any change in filter
//! criteria produces a new value; nothing mutates a selection in place,
//! which is what lets the reconciliation engine diff old against new.

use std::sync::Arc;

use tracing::warn;

use crate::key;
use crate::types::IncidKey;

/// Immutable ordered key list representing the active filter.
#[derive(Clone, Debug)]
pub struct SelectionSet {
    keys: Arc<[IncidKey]>,
}

/// Result of building a selection from untrusted key text: the selection
/// plus the number of malformed keys that were skipped.
#[derive(Debug)]
pub struct SelectionBuild {
    /// The selection over the keys that parsed.
    pub selection: SelectionSet,
    /// Keys dropped because the codec rejected them. Surfaced, not hidden:
    /// callers log or display this as a partial failure.
    pub skipped: usize,
}

impl SelectionSet {
    /// Builds a selection from already-validated keys, sorting them into
    /// codec order and dropping duplicates.
    pub fn from_keys(mut keys: Vec<IncidKey>) -> Self {
        keys.sort_by_key(|k| key::to_ordinal(k).unwrap_or(u64::MAX));
        keys.dedup();
        Self { keys: keys.into() }
    }

    /// Builds a selection from raw key text (an attribute-query result),
    /// skipping and counting keys the codec rejects. A single bad key in a
    /// bulk list is tolerated; it never aborts the build.
    pub fn from_raw_keys<'a>(raw: impl IntoIterator<Item = &'a str>) -> SelectionBuild {
        let mut keys = Vec::new();
        let mut skipped = 0usize;
        for text in raw {
            let candidate = IncidKey::from(text);
            match key::to_ordinal(&candidate) {
                Ok(_) => keys.push(candidate),
                Err(err) => {
                    warn!(key = text, error = %err, "selection.build.skipped_key");
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            warn!(skipped, kept = keys.len(), "selection.build.partial");
        }
        SelectionBuild {
            selection: Self::from_keys(keys),
            skipped,
        }
    }

    /// Number of keys in the selection.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the filter matched nothing.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key at a zero-based position, in codec order.
    pub fn get(&self, index: usize) -> Option<&IncidKey> {
        self.keys.get(index)
    }

    /// All keys in codec order.
    pub fn keys(&self) -> &[IncidKey] {
        &self.keys
    }
}

impl PartialEq for SelectionSet {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl Eq for SelectionSet {}
