//! Core identifier newtypes, scalar field values, and the crate error type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Textual key of a logical record ("incid"). Ordering across the remote
/// table is induced by the ordered-key codec, not by string comparison.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct IncidKey(pub String);

/// Identifier of the shared-origin grouping beneath an incid.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct ParentId(pub u64);

/// Identifier of an individual piece beneath a parent.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct FragmentId(pub u32);

impl IncidKey {
    /// Borrows the textual form of the key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IncidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IncidKey {
    fn from(value: &str) -> Self {
        IncidKey(value.to_owned())
    }
}

impl fmt::Display for ParentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scalar value stored in a record field. `Null` is a present-but-null
/// column; a field absent from the record map is a different state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Value {
    /// Null column value.
    Null,
    /// Boolean column value.
    Bool(bool),
    /// Signed 64-bit integer column value.
    Int(i64),
    /// 64-bit floating point column value.
    Float(f64),
    /// UTF-8 text column value.
    Text(String),
    /// Days since the Unix epoch.
    Date(i64),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Errors surfaced across the cursor, selection, and reconciliation layers.
#[derive(thiserror::Error, Debug)]
pub enum TessellaError {
    /// A key could not be parsed by the ordered-key codec.
    #[error("malformed key '{0}'")]
    MalformedKey(String),
    /// The relational store was unreachable or a query failed; the previous
    /// cursor window is kept.
    #[error("load failed: {0}")]
    LoadFailed(String),
    /// The requested record no longer exists; the active selection is stale
    /// and must be rebuilt.
    #[error("no record found")]
    NoRecordFound,
    /// A predicate exceeded the backend length limit and no join fallback
    /// was available.
    #[error("predicate exceeds {max} bytes (got {len})")]
    PredicateTooLarge {
        /// Serialized predicate length.
        len: usize,
        /// Backend limit.
        max: usize,
    },
    /// Writing keys to the scratch table failed; the reconciliation pass is
    /// aborted with no partial state retained.
    #[error("scratch table write failed: {0}")]
    ScratchWriteFailed(String),
    /// The operator declined a confirmation prompt.
    #[error("cancelled by operator")]
    Cancelled,
    /// Fault reported by a store or spatial adapter.
    #[error("adapter error: {0}")]
    Adapter(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TessellaError>;
