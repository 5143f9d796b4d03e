//! Structured predicates handed to the relational and spatial adapters.
//!
//! Predicates are values, not SQL text; adapters render them for their own
//! backend. `serialized_len` conservatively estimates the rendered length
//! so callers can honor backend predicate-size limits before submitting.

use crate::types::IncidKey;

/// Fixed per-clause overhead assumed for rendered comparison clauses.
const CLAUSE_OVERHEAD: usize = 16;

/// A relational/spatial filter over the ordered key column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// Every row of the table.
    All,
    /// Rows whose key orders at or below the bound (inclusive). Used by the
    /// cursor's counting probe.
    KeyAtMost(IncidKey),
    /// Rows whose key orders at or above the bound (inclusive). Used to load
    /// a page starting at a resolved key.
    KeyAtLeast(IncidKey),
    /// Rows whose key is one of the listed keys.
    KeyIn(Vec<IncidKey>),
    /// Rows joined against the scratch side table previously written with
    /// [`crate::store::RelationalStore::write_scratch`].
    ScratchJoin,
}

impl Predicate {
    /// Estimated length of the predicate once rendered by an adapter.
    pub fn serialized_len(&self) -> usize {
        match self {
            Predicate::All => CLAUSE_OVERHEAD,
            Predicate::KeyAtMost(key) | Predicate::KeyAtLeast(key) => {
                CLAUSE_OVERHEAD + key.as_str().len()
            }
            // Per key: two quotes plus a separator.
            Predicate::KeyIn(keys) => {
                CLAUSE_OVERHEAD + keys.iter().map(|k| k.as_str().len() + 3).sum::<usize>()
            }
            Predicate::ScratchJoin => CLAUSE_OVERHEAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Predicate;
    use crate::types::IncidKey;

    #[test]
    fn in_list_length_grows_with_keys() {
        let short = Predicate::KeyIn(vec![IncidKey::from("A1")]);
        let long = Predicate::KeyIn(vec![
            IncidKey::from("A1"),
            IncidKey::from("A2"),
            IncidKey::from("A300"),
        ]);
        assert!(long.serialized_len() > short.serialized_len());
    }

    #[test]
    fn scalar_predicates_have_bounded_length() {
        assert!(Predicate::All.serialized_len() < 64);
        assert!(Predicate::ScratchJoin.serialized_len() < 64);
        assert!(Predicate::KeyAtMost(IncidKey::from("ZZZZ99999999")).serialized_len() < 64);
    }
}
